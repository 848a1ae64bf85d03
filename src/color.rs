use palette::{Hsl, IntoColor, Srgb};

use crate::data::model::{
    LineStyle, Marker, ModeType, Population, SeriesStyle, SeriesTags, Source,
};

pub const BLUE: Srgb<u8> = Srgb::new(31, 119, 180);
pub const BLACK: Srgb<u8> = Srgb::new(0, 0, 0);
pub const GRAY: Srgb<u8> = Srgb::new(128, 128, 128);
pub const RED: Srgb<u8> = Srgb::new(214, 39, 40);

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Srgb<u8>> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.45);
            let rgb: Srgb = hsl.into_color();
            rgb.into_format()
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Series styling
// ---------------------------------------------------------------------------

pub fn population_color(population: Option<Population>) -> Srgb<u8> {
    match population {
        Some(Population::Positive) => BLUE,
        Some(Population::Negative) => BLACK,
        Some(Population::Unlabeled) | None => GRAY,
    }
}

/// Assign a style to every series of one chart.
///
/// Archimedes curves are coloured by population with circle markers. A lone
/// DLS curve is red; several DLS curves share an evenly spaced palette.
/// MADLS curves are dashed.
pub fn assign_styles<'a, I>(series: I) -> Vec<SeriesStyle>
where
    I: IntoIterator<Item = (Source, &'a SeriesTags)>,
{
    let series: Vec<(Source, &SeriesTags)> = series.into_iter().collect();
    let dls_count = series.iter().filter(|(s, _)| *s == Source::Dls).count();
    let dls_palette = if dls_count > 1 {
        generate_palette(dls_count)
    } else {
        vec![RED]
    };

    let mut dls_index = 0;
    series
        .into_iter()
        .map(|(source, tags)| match source {
            Source::Archimedes => SeriesStyle {
                color: population_color(tags.population),
                line: LineStyle::Solid,
                marker: Marker::Circle,
            },
            Source::Dls => {
                let color = dls_palette[dls_index % dls_palette.len()];
                dls_index += 1;
                let line = match tags.channel.map(|c| c.mode) {
                    Some(ModeType::Madls) => LineStyle::Dashed,
                    _ => LineStyle::Solid,
                };
                SeriesStyle {
                    color,
                    line,
                    marker: Marker::Square,
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Channel, Weighting};

    #[test]
    fn palette_has_distinct_colours() {
        let p = generate_palette(4);
        assert_eq!(p.len(), 4);
        for i in 0..p.len() {
            for j in i + 1..p.len() {
                assert_ne!(p[i], p[j]);
            }
        }
        assert!(generate_palette(0).is_empty());
    }

    #[test]
    fn populations_and_single_dls() {
        let pos = SeriesTags {
            population: Some(Population::Positive),
            ..SeriesTags::default()
        };
        let neg = SeriesTags {
            population: Some(Population::Negative),
            ..SeriesTags::default()
        };
        let dls = SeriesTags {
            channel: Some(Channel::new(ModeType::Madls, Weighting::Volume)),
            ..SeriesTags::default()
        };
        let styles = assign_styles([
            (Source::Archimedes, &pos),
            (Source::Archimedes, &neg),
            (Source::Dls, &dls),
        ]);
        assert_eq!(styles[0].color, BLUE);
        assert_eq!(styles[1].color, BLACK);
        assert_eq!(styles[2].color, RED);
        assert_eq!(styles[2].line, LineStyle::Dashed);
        assert_eq!(styles[2].marker, Marker::Square);
    }
}
