// Cadenza
// Copyright (c) 2026 The Project Cadenza Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `huffman` module provides a binary-tree Huffman decoder that reads codes one bit at a time
//! from a [`BitQueue`].

use std::io;

use super::BitQueue;

/// The index of a node in a `HuffmanTree`. The root is never a child, so 0 marks a missing branch.
type NodeIndex = u32;

const NO_NODE: NodeIndex = 0;

#[derive(Copy, Clone, Debug)]
enum Node {
    Branch { zero: NodeIndex, one: NodeIndex },
    Leaf(u16),
}

/// A `HuffmanTree` maps a prefix-free set of code words to values.
///
/// The tree is walked from the root, one bit at a time, until a leaf is reached.
#[derive(Clone, Debug)]
pub struct HuffmanTree {
    nodes: Vec<Node>,
}

/// Errors that may occur while compiling a `HuffmanTree`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HuffmanBuildError {
    /// A code word is longer than 32 bits, or is zero bits long.
    InvalidLength,
    /// A code word is a prefix of, or is prefixed by, another code word.
    NotPrefixFree,
}

impl HuffmanTree {
    /// Compile a tree from `(code, length, value)` triples. Code words are right-aligned in
    /// `code` with the first bit to be read being the most-significant of the `length` bits.
    pub fn new<I>(entries: I) -> Result<Self, HuffmanBuildError>
    where
        I: IntoIterator<Item = (u32, u8, u16)>,
    {
        let mut nodes = vec![Node::Branch { zero: NO_NODE, one: NO_NODE }];

        for (code, len, value) in entries {
            if len == 0 || u32::from(len) > u32::BITS {
                return Err(HuffmanBuildError::InvalidLength);
            }

            let mut cur = 0;

            for i in (0..u32::from(len)).rev() {
                let bit = (code >> i) & 1 == 1;
                let is_last = i == 0;

                let (zero, one) = match nodes[cur] {
                    Node::Branch { zero, one } => (zero, one),
                    Node::Leaf(_) => return Err(HuffmanBuildError::NotPrefixFree),
                };

                let next = if bit { one } else { zero };

                if next != NO_NODE {
                    if is_last {
                        return Err(HuffmanBuildError::NotPrefixFree);
                    }
                    cur = next as usize;
                    continue;
                }

                let child = nodes.len() as NodeIndex;

                nodes.push(if is_last {
                    Node::Leaf(value)
                }
                else {
                    Node::Branch { zero: NO_NODE, one: NO_NODE }
                });

                nodes[cur] = if bit {
                    Node::Branch { zero, one: child }
                }
                else {
                    Node::Branch { zero: child, one }
                };

                cur = child as usize;
            }
        }

        Ok(HuffmanTree { nodes })
    }

    /// Returns `true` if the tree contains no code words.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Reads one code word from `bs` and returns its value.
    ///
    /// An `UnexpectedEof` error is returned if the queue runs dry before a leaf is reached, and an
    /// `InvalidData` error if the bits read do not form a code word of the tree. In both cases the
    /// bits read so far remain consumed.
    pub fn decode(&self, bs: &mut BitQueue) -> io::Result<u16> {
        let mut cur = 0;

        loop {
            match self.nodes[cur] {
                Node::Leaf(value) => return Ok(value),
                Node::Branch { zero, one } => {
                    let next = if bs.pop_bit()? { one } else { zero };

                    if next == NO_NODE {
                        return Err(io::Error::new(
                            io::ErrorKind::InvalidData,
                            "invalid huffman code",
                        ));
                    }

                    cur = next as usize;
                }
            }
        }
    }
}
