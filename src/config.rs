//! Runtime options for a [`NesBus`](crate::bus::NesBus).

/// Sprites drawn per scanline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpriteLimit {
    /// 8 sprites, like the 2C02. Games flicker to work around it.
    #[default]
    Hardware,
    /// 16 sprites. Removes most flicker; the overflow flag still trips on the 9th sprite.
    Relaxed,
}

impl SpriteLimit {
    pub fn max_sprites(self) -> usize {
        match self {
            SpriteLimit::Hardware => 8,
            SpriteLimit::Relaxed => 16,
        }
    }
}

/// Core configuration. `Config::default()` gives 44.1 kHz audio and the hardware sprite limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Output sample rate handed to the APU, in Hz.
    pub sample_rate: u32,
    pub sprite_limit: SpriteLimit,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            sprite_limit: SpriteLimit::Hardware,
        }
    }
}
