// Cadenza
// Copyright (c) 2026 The Project Cadenza Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared building blocks for Project Cadenza: the common error type, a bit-level byte queue used
//! as a bit reservoir, and checksums.

pub mod checksum;
pub mod errors;
pub mod io;
