//! Derivative planner
//!
//! Static sizing tables, one per category. A table is a list of
//! `(purpose, derivatives)` rows; the order of derivatives within a row is the
//! order in which they are produced and written.

use std::sync::LazyLock;

use deriva_core::constants::{DERIVATIVE_SUFFIXES, OUTPUT_EXTENSION};
use deriva_core::{Category, DerivativeSpec, Purpose, Rgba};
use regex::Regex;

/// Sizing table of one category.
pub type PlanTable = &'static [(Purpose, &'static [DerivativeSpec])];

const LOGO: &[DerivativeSpec] = &[DerivativeSpec::cover(200, 200, 90).with_background(Rgba::TRANSPARENT)];
const PROFILE: &[DerivativeSpec] = &[DerivativeSpec::cover(400, 400, 85)];

const GALLERY: &[DerivativeSpec] = &[
    DerivativeSpec::inside_width(1920, 85).with_suffix("slide"),
    DerivativeSpec::inside_width(400, 60).with_suffix("thumb"),
];

const RESPONSIVE_BANNER: &[DerivativeSpec] = &[
    DerivativeSpec::inside_width(480, 80).with_suffix("small"),
    DerivativeSpec::inside_width(768, 80).with_suffix("medium"),
    DerivativeSpec::inside_width(1080, 80).with_suffix("large"),
    DerivativeSpec::inside_width(1440, 80).with_suffix("xlarge"),
];

const WIDE_CARD: &[DerivativeSpec] = &[DerivativeSpec::cover(800, 450, 80)];

static BUSINESSES: PlanTable = &[
    (Purpose::Logo, LOGO),
    (Purpose::Profile, PROFILE),
    (Purpose::Banner, &[DerivativeSpec::cover(1600, 400, 80)]),
    (Purpose::Card, &[DerivativeSpec::cover(800, 600, 80)]),
    (Purpose::Gallery, GALLERY),
    (Purpose::ServiceThumb, &[DerivativeSpec::cover(400, 300, 75)]),
    (Purpose::ClientThumb, &[DerivativeSpec::cover(200, 200, 80)]),
    (Purpose::RewardThumb, &[DerivativeSpec::cover(300, 300, 80)]),
];

static EVENTS: PlanTable = &[
    (Purpose::Banner, RESPONSIVE_BANNER),
    (Purpose::Card, WIDE_CARD),
    (Purpose::Gallery, GALLERY),
    (Purpose::Logo, LOGO),
];

static WORKSHOPS: PlanTable = &[
    (Purpose::Banner, RESPONSIVE_BANNER),
    (Purpose::Card, WIDE_CARD),
    (Purpose::Gallery, GALLERY),
    (Purpose::Profile, PROFILE),
];

/// `_(suffix|...)\.webp$`, built from the suffixes the tables may use.
fn derivative_name_pattern() -> String {
    let suffixes: Vec<String> = DERIVATIVE_SUFFIXES.iter().map(|s| regex::escape(s)).collect();
    format!(
        r"_({})\.{}$",
        suffixes.join("|"),
        regex::escape(OUTPUT_EXTENSION)
    )
}

static DERIVATIVE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&derivative_name_pattern())
        .unwrap_or_else(|e| panic!("invalid derivative name pattern: {e}"))
});

/// True when `path` looks like something this pipeline writes with a suffix.
///
/// Used as a secondary loop guard for outputs whose metadata tag was lost.
pub fn is_derivative_path(path: &str) -> bool {
    DERIVATIVE_NAME.is_match(path)
}

/// Planner bound to one category's table.
#[derive(Debug, Clone, Copy)]
pub struct DerivativePlanner {
    table: PlanTable,
}

impl DerivativePlanner {
    pub fn for_category(category: Category) -> Self {
        let table = match category {
            Category::Businesses => BUSINESSES,
            Category::Events => EVENTS,
            Category::Workshops => WORKSHOPS,
        };
        Self { table }
    }

    /// Derivatives for `purpose`, in production order.
    ///
    /// Empty for [`Purpose::Unknown`] and for purposes the table does not list.
    pub fn plan(&self, purpose: Purpose) -> &'static [DerivativeSpec] {
        if purpose == Purpose::Unknown {
            return &[];
        }
        self.table
            .iter()
            .find(|(p, _)| *p == purpose)
            .map(|(_, specs)| *specs)
            .unwrap_or(&[])
    }
}

/// Plan derivatives for `purpose` with the built-in table of `category`.
pub fn plan(purpose: Purpose, category: Category) -> Vec<DerivativeSpec> {
    DerivativePlanner::for_category(category).plan(purpose).to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use deriva_core::FitMode;

    #[test]
    fn test_business_logo_single_transparent_cover() {
        let specs = plan(Purpose::Logo, Category::Businesses);
        assert_eq!(specs.len(), 1);
        let spec = &specs[0];
        assert_eq!(spec.suffix, None);
        assert_eq!((spec.width, spec.height), (Some(200), Some(200)));
        assert_eq!(spec.fit_mode, FitMode::Cover);
        assert_eq!(spec.quality, 90);
        assert_eq!(spec.background.map(|b| b.a), Some(0));
        assert_eq!(
            spec.output_path("businesses/abc123/logo.png"),
            "businesses/abc123/logo.webp"
        );
    }

    #[test]
    fn test_event_banner_four_widths_in_order() {
        let specs = plan(Purpose::Banner, Category::Events);
        let summary: Vec<_> = specs.iter().map(|s| (s.suffix, s.width, s.quality)).collect();
        assert_eq!(
            summary,
            vec![
                (Some("small"), Some(480), 80),
                (Some("medium"), Some(768), 80),
                (Some("large"), Some(1080), 80),
                (Some("xlarge"), Some(1440), 80),
            ]
        );
        assert!(specs
            .iter()
            .all(|s| s.fit_mode == FitMode::Inside && s.without_enlargement && s.height.is_none()));
    }

    #[test]
    fn test_gallery_slide_then_thumb() {
        for category in Category::ALL {
            let specs = plan(Purpose::Gallery, category);
            assert_eq!(specs.len(), 2);
            assert_eq!((specs[0].suffix, specs[0].width, specs[0].quality), (Some("slide"), Some(1920), 85));
            assert_eq!((specs[1].suffix, specs[1].width, specs[1].quality), (Some("thumb"), Some(400), 60));
            assert_eq!(
                specs[1].output_path("businesses/xyz/gallery/photo1.jpg"),
                "businesses/xyz/gallery/photo1_thumb.webp"
            );
        }
    }

    #[test]
    fn test_category_specific_sizes() {
        let card = plan(Purpose::Card, Category::Businesses);
        assert_eq!((card[0].width, card[0].height), (Some(800), Some(600)));
        let card = plan(Purpose::Card, Category::Workshops);
        assert_eq!((card[0].width, card[0].height), (Some(800), Some(450)));

        let banner = plan(Purpose::Banner, Category::Businesses);
        assert_eq!(banner.len(), 1);
        assert_eq!((banner[0].width, banner[0].height), (Some(1600), Some(400)));
    }

    #[test]
    fn test_unknown_and_unlisted_purposes_plan_nothing() {
        for category in Category::ALL {
            assert!(plan(Purpose::Unknown, category).is_empty());
        }
        assert!(plan(Purpose::ServiceThumb, Category::Events).is_empty());
        assert!(plan(Purpose::RewardThumb, Category::Workshops).is_empty());
    }

    #[test]
    fn test_derivative_path_detection() {
        assert!(is_derivative_path("events/e1/banner_raw_small.webp"));
        assert!(is_derivative_path("businesses/x/gallery/p_thumb.webp"));
        assert!(!is_derivative_path("businesses/x/gallery/p_thumb.jpg"));
        assert!(!is_derivative_path("businesses/abc/logo.webp"));
        assert!(!is_derivative_path("events/e1/banner_small.webp.png"));
    }

    #[test]
    fn test_every_table_suffix_is_a_derivative_name() {
        for table in [BUSINESSES, EVENTS, WORKSHOPS] {
            for (purpose, specs) in table {
                for spec in specs.iter().filter(|s| s.suffix.is_some()) {
                    let output = spec.output_path("c/x.jpg");
                    assert!(
                        is_derivative_path(&output),
                        "{:?} output {} is not recognised as a derivative",
                        purpose,
                        output
                    );
                }
            }
        }
    }

    #[test]
    fn test_pattern_is_built_from_suffix_list() {
        let pattern = derivative_name_pattern();
        for suffix in DERIVATIVE_SUFFIXES {
            assert!(pattern.contains(suffix));
            assert!(is_derivative_path(&format!("events/e1/a_{}.webp", suffix)));
        }
    }
}
