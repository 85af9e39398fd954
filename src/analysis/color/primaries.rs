use super::ColorSpace;
use crate::common::{Chromaticities, Chromaticity};

/// Summed xy distance under which a header matches a known set of primaries.
pub const EXACT_MATCH_DISTANCE: f32 = 0.05;
/// Summed xy distance under which the match is reported as approximate.
pub const APPROXIMATE_MATCH_DISTANCE: f32 = 0.15;

pub struct KnownPrimaries {
    pub name: &'static str,
    pub color_space: ColorSpace,
    pub chromaticities: Chromaticities,
}

const fn primaries(
    red: (f32, f32),
    green: (f32, f32),
    blue: (f32, f32),
    white: (f32, f32),
) -> Chromaticities {
    Chromaticities {
        red: Chromaticity::new(red.0, red.1),
        green: Chromaticity::new(green.0, green.1),
        blue: Chromaticity::new(blue.0, blue.1),
        white: Chromaticity::new(white.0, white.1),
    }
}

pub const KNOWN_PRIMARIES: [KnownPrimaries; 5] = [
    KnownPrimaries {
        name: "ACES AP0",
        color_space: ColorSpace::Aces,
        chromaticities: primaries((0.7347, 0.2653), (0.0, 1.0), (0.0001, -0.077), (0.32168, 0.33767)),
    },
    KnownPrimaries {
        name: "ACES AP1 (ACEScg)",
        color_space: ColorSpace::Aces,
        chromaticities: primaries((0.713, 0.293), (0.165, 0.830), (0.128, 0.044), (0.32168, 0.33767)),
    },
    KnownPrimaries {
        name: "Rec.709 / sRGB",
        color_space: ColorSpace::Rec709,
        chromaticities: primaries((0.64, 0.33), (0.30, 0.60), (0.15, 0.06), (0.3127, 0.3290)),
    },
    KnownPrimaries {
        name: "Rec.2020",
        color_space: ColorSpace::Rec2020,
        chromaticities: primaries((0.708, 0.292), (0.170, 0.797), (0.131, 0.046), (0.3127, 0.3290)),
    },
    KnownPrimaries {
        name: "DCI-P3",
        color_space: ColorSpace::DciP3,
        chromaticities: primaries((0.680, 0.320), (0.265, 0.690), (0.150, 0.060), (0.3140, 0.3510)),
    },
];

fn distance(a: &Chromaticities, b: &Chromaticities) -> f32 {
    [
        (a.red, b.red),
        (a.green, b.green),
        (a.blue, b.blue),
        (a.white, b.white),
    ]
    .iter()
    .map(|(p, q)| (p.x - q.x).abs() + (p.y - q.y).abs())
    .sum()
}

/// Closest known primaries and their summed absolute xy distance.
pub fn nearest(chromaticities: &Chromaticities) -> (&'static KnownPrimaries, f32) {
    let mut best = &KNOWN_PRIMARIES[0];
    let mut best_distance = f32::INFINITY;
    for known in &KNOWN_PRIMARIES {
        let d = distance(chromaticities, &known.chromaticities);
        if d < best_distance {
            best = known;
            best_distance = d;
        }
    }
    (best, best_distance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_primaries_match_with_zero_distance() {
        let (known, d) = nearest(&KNOWN_PRIMARIES[3].chromaticities);
        assert_eq!(known.color_space, ColorSpace::Rec2020);
        assert_eq!(d, 0.0);
    }

    #[test]
    fn slightly_off_primaries_still_resolve() {
        let mut p3 = KNOWN_PRIMARIES[4].chromaticities;
        p3.white = Chromaticity::new(0.3127, 0.3290);
        p3.green = Chromaticity::new(0.295, 0.690);
        let (known, d) = nearest(&p3);
        assert_eq!(known.color_space, ColorSpace::DciP3);
        assert!(d > EXACT_MATCH_DISTANCE && d < APPROXIMATE_MATCH_DISTANCE);
    }
}
