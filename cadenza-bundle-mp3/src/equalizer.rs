// Cadenza
// Copyright (c) 2026 The Project Cadenza Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/// The number of equalizer bands. There is one band per polyphase sub-band.
pub const EQ_BANDS: usize = 32;

/// The setting of a band that is removed entirely from the output.
pub const BAND_NOT_PRESENT: f32 = f32::NEG_INFINITY;

/// A 32-band equalizer applied to the sub-band samples before polyphase synthesis.
///
/// Each band setting is in the range `[-1.0, 1.0]` and scales its sub-band by `2^setting`, or is
/// [`BAND_NOT_PRESENT`] to silence the sub-band.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Equalizer {
    settings: [f32; EQ_BANDS],
}

impl Default for Equalizer {
    fn default() -> Self {
        Equalizer { settings: [0.0; EQ_BANDS] }
    }
}

impl From<&[f32]> for Equalizer {
    /// Instantiate an equalizer from up-to 32 band settings. Missing bands are flat, and excess
    /// settings are ignored.
    fn from(settings: &[f32]) -> Self {
        let mut eq = Equalizer::default();

        for (band, &setting) in settings.iter().take(EQ_BANDS).enumerate() {
            eq.settings[band] = limit(setting);
        }

        eq
    }
}

impl Equalizer {
    /// Instantiate a flat equalizer.
    pub fn new() -> Self {
        Default::default()
    }

    /// Sets all bands flat.
    pub fn reset(&mut self) {
        self.settings = [0.0; EQ_BANDS];
    }

    /// Sets a band, and returns its previous setting. Settings are clamped to `[-1.0, 1.0]`.
    /// Bands out-of-range are ignored and yield 0.
    pub fn set_band(&mut self, band: usize, setting: f32) -> f32 {
        match self.settings.get_mut(band) {
            Some(current) => std::mem::replace(current, limit(setting)),
            None => 0.0,
        }
    }

    /// Gets the setting of a band. Bands out-of-range yield 0.
    pub fn band(&self, band: usize) -> f32 {
        self.settings.get(band).copied().unwrap_or(0.0)
    }

    pub fn settings(&self) -> &[f32; EQ_BANDS] {
        &self.settings
    }

    /// Returns `true` if every band is flat.
    pub fn is_flat(&self) -> bool {
        self.settings.iter().all(|&s| s == 0.0)
    }

    /// Gets the gain factor of every band.
    pub fn factors(&self) -> [f64; EQ_BANDS] {
        let mut factors = [0.0; EQ_BANDS];

        for (factor, &setting) in factors.iter_mut().zip(&self.settings) {
            *factor = band_factor(setting);
        }

        factors
    }
}

fn limit(setting: f32) -> f32 {
    if setting == BAND_NOT_PRESENT {
        setting
    }
    else if setting.is_nan() {
        0.0
    }
    else {
        setting.clamp(-1.0, 1.0)
    }
}

/// Converts a band setting to the factor `2^setting`.
fn band_factor(setting: f32) -> f64 {
    if setting == BAND_NOT_PRESENT {
        0.0
    }
    else {
        f64::powf(2.0, f64::from(setting))
    }
}
