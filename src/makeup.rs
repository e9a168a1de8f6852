//! Cosmetic categories, the shade catalog and the per-frame makeup settings.

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    Lipstick,
    Blush,
    Eyeshadow,
    Eyebrow,
}

impl Category {
    /// Display order of the product cards.
    pub const ALL: [Category; 4] = [
        Category::Lipstick,
        Category::Blush,
        Category::Eyeshadow,
        Category::Eyebrow,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Category::Lipstick => "Lipstick",
            Category::Blush => "Blush",
            Category::Eyeshadow => "Eyeshadow",
            Category::Eyebrow => "Eyebrow",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Category::Lipstick => "💄",
            Category::Blush => "🌸",
            Category::Eyeshadow => "👁️",
            Category::Eyebrow => "🖌️",
        }
    }

    /// Per-region tuning: the same slider position paints blush and brows
    /// lighter than lips and lids.
    pub fn alpha_divisor(&self) -> f32 {
        match self {
            Category::Lipstick => 150.0,
            Category::Blush => 200.0,
            Category::Eyeshadow => 150.0,
            Category::Eyebrow => 180.0,
        }
    }

    pub fn shades(&self) -> &'static [Shade] {
        match self {
            Category::Lipstick => LIPSTICK_SHADES,
            Category::Blush => BLUSH_SHADES,
            Category::Eyeshadow => EYESHADOW_SHADES,
            Category::Eyebrow => EYEBROW_SHADES,
        }
    }

    fn index(&self) -> usize {
        match self {
            Category::Lipstick => 0,
            Category::Blush => 1,
            Category::Eyeshadow => 2,
            Category::Eyebrow => 3,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const fn from_hex(hex: u32) -> Self {
        Rgb((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
    }

    pub fn to_hex(&self) -> u32 {
        ((self.0 as u32) << 16) | ((self.1 as u32) << 8) | self.2 as u32
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Shade {
    pub name: &'static str,
    pub color: Rgb,
}

const fn shade(name: &'static str, hex: u32) -> Shade {
    Shade {
        name,
        color: Rgb::from_hex(hex),
    }
}

pub const SHADES_PER_CATEGORY: usize = 5;

const LIPSTICK_SHADES: &[Shade] = &[
    shade("Classic Red", 0xE91E63),
    shade("Raspberry", 0xD81B60),
    shade("Vivid Pink", 0xF06292),
    shade("Plum", 0x880E4F),
    shade("Magenta", 0xAD1457),
];

const BLUSH_SHADES: &[Shade] = &[
    shade("Light Pink", 0xF8BBD0),
    shade("Hot Pink", 0xEC407A),
    shade("Rose", 0xF06292),
    shade("Peach", 0xFFAB91),
    shade("Coral", 0xFF7043),
];

const EYESHADOW_SHADES: &[Shade] = &[
    shade("Brown", 0x5D4037),
    shade("Copper", 0xBCAAA4),
    shade("Bronze", 0xA9746E),
    shade("Mocha", 0x8D6E63),
    shade("Beige", 0xFFECB3),
];

const EYEBROW_SHADES: &[Shade] = &[
    shade("Soft Brown", 0x5D4037),
    shade("Charcoal", 0x36454F),
    shade("Dark Brown", 0x3E2723),
    shade("Ebony", 0x1C1C1C),
    shade("Ash", 0xB2BEB5),
];

/// Blend strength in percent, always within `0..=100`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Intensity(u8);

impl Intensity {
    pub const MAX: u8 = 100;

    pub fn new(percent: i32) -> Self {
        Intensity(percent.clamp(0, Self::MAX as i32) as u8)
    }

    /// Snap a continuous control position to the nearest whole percent.
    pub fn from_fraction_percent(value: f32) -> Self {
        if value.is_nan() {
            return Intensity(0);
        }
        Intensity(value.round().clamp(0.0, Self::MAX as f32) as u8)
    }

    pub fn percent(&self) -> u8 {
        self.0
    }

    pub fn is_off(&self) -> bool {
        self.0 == 0
    }

    /// Fill alpha for `category`, in `0.0..=1.0`.
    pub fn alpha_for(&self, category: Category) -> f32 {
        (self.0 as f32 / category.alpha_divisor()).clamp(0.0, 1.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProductSetting {
    pub intensity: Intensity,
    shade_index: usize,
}

impl ProductSetting {
    pub fn shade_index(&self) -> usize {
        self.shade_index
    }
}

/// Immutable makeup selection handed to the compositor each frame.
///
/// Updates return a new value; the shade index is checked on the way in, so
/// [`MakeupConfig::shade`] can never index out of the catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MakeupConfig {
    products: [ProductSetting; 4],
}

impl Default for MakeupConfig {
    fn default() -> Self {
        let setting = |percent| ProductSetting {
            intensity: Intensity::new(percent),
            shade_index: 0,
        };
        Self {
            products: [setting(75), setting(65), setting(75), setting(50)],
        }
    }
}

impl MakeupConfig {
    pub fn setting(&self, category: Category) -> ProductSetting {
        self.products[category.index()]
    }

    pub fn intensity(&self, category: Category) -> Intensity {
        self.setting(category).intensity
    }

    pub fn shade(&self, category: Category) -> Shade {
        category.shades()[self.setting(category).shade_index]
    }

    pub fn with_intensity(mut self, category: Category, intensity: Intensity) -> Self {
        self.products[category.index()].intensity = intensity;
        self
    }

    /// `None` if `index` is not a shade of `category`.
    pub fn with_shade(mut self, category: Category, index: usize) -> Option<Self> {
        if index >= category.shades().len() {
            return None;
        }
        self.products[category.index()].shade_index = index;
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_five_shades_per_category() {
        for category in Category::ALL {
            assert_eq!(category.shades().len(), SHADES_PER_CATEGORY);
        }
        assert_eq!(Category::Lipstick.shades()[0].color, Rgb(0xE9, 0x1E, 0x63));
        assert_eq!(Category::Eyebrow.shades()[4].name, "Ash");
    }

    #[test]
    fn alpha_stays_in_unit_range_for_every_divisor() {
        for category in Category::ALL {
            for percent in 0..=100 {
                let alpha = Intensity::new(percent).alpha_for(category);
                assert!((0.0..=1.0).contains(&alpha), "{category:?} {percent} -> {alpha}");
            }
        }
        assert_eq!(Intensity::new(100).alpha_for(Category::Lipstick), 100.0 / 150.0);
        assert_eq!(Intensity::new(100).alpha_for(Category::Blush), 0.5);
    }

    #[test]
    fn intensity_is_clamped() {
        assert_eq!(Intensity::new(-5).percent(), 0);
        assert_eq!(Intensity::new(250).percent(), 100);
        assert!(Intensity::new(0).is_off());
    }

    #[test]
    fn every_whole_percent_is_reachable_from_a_slider() {
        for percent in 0..=Intensity::MAX {
            let value = percent as f32 + 0.3;
            assert_eq!(Intensity::from_fraction_percent(value).percent(), percent);
        }
        assert_eq!(Intensity::from_fraction_percent(42.5).percent(), 43);
        assert_eq!(Intensity::from_fraction_percent(-3.0).percent(), 0);
        assert_eq!(Intensity::from_fraction_percent(180.0).percent(), 100);
        assert!(Intensity::from_fraction_percent(f32::NAN).is_off());
    }

    #[test]
    fn defaults_match_reset_values() {
        let cfg = MakeupConfig::default();
        assert_eq!(cfg.intensity(Category::Lipstick).percent(), 75);
        assert_eq!(cfg.intensity(Category::Blush).percent(), 65);
        assert_eq!(cfg.intensity(Category::Eyeshadow).percent(), 75);
        assert_eq!(cfg.intensity(Category::Eyebrow).percent(), 50);
        for category in Category::ALL {
            assert_eq!(cfg.setting(category).shade_index(), 0);
        }
    }

    #[test]
    fn shade_selection_rejects_out_of_range() {
        let cfg = MakeupConfig::default();
        assert!(cfg.with_shade(Category::Blush, 5).is_none());

        let cfg = cfg.with_shade(Category::Blush, 4).unwrap();
        assert_eq!(cfg.shade(Category::Blush).name, "Coral");
        assert_eq!(cfg.shade(Category::Lipstick).name, "Classic Red");
    }
}
