use anyhow::{anyhow, Result};
use log::warn;
use plotters::prelude::*;

use crate::report::html::escape;
use crate::utils::hits::MatchQuality;
use crate::utils::phenotype::ClassQualityCounts;

const CHART_SIZE: (u32, u32) = (800, 450);
const NO_DATA_CAPTION: &str = "No AMR genes with a known drug class were found";

fn tier_color(quality: MatchQuality) -> RGBColor {
    match quality {
        MatchQuality::Perfect => RGBColor(46, 139, 87),
        MatchQuality::Good => RGBColor(70, 130, 180),
        MatchQuality::Partial => RGBColor(255, 165, 0),
        MatchQuality::Unknown => RGBColor(169, 169, 169),
    }
}

/// Stacked bar chart of AMR hits per drug class, one stack segment per
/// match quality tier. Rendered to an SVG string for embedding.
pub fn plot_drug_class_distribution(counts: &ClassQualityCounts) -> Result<String> {
    if counts.is_empty() {
        return Err(anyhow!("No drug class data available for plotting"));
    }
    let classes: Vec<&String> = counts.keys().collect();
    let max_total = counts
        .values()
        .map(|tiers| tiers.values().sum::<usize>())
        .max()
        .unwrap_or(1)
        .max(1);

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, CHART_SIZE).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption("AMR genes per drug class", ("sans-serif", 20))
            .margin(10)
            .x_label_area_size(60)
            .y_label_area_size(40)
            .build_cartesian_2d((0..classes.len()).into_segmented(), 0..max_total + 1)?;

        chart.configure_mesh()
            .disable_x_mesh()
            .x_labels(classes.len())
            .x_label_formatter(&|v| match v {
                SegmentValue::CenterOf(i) => classes.get(*i).map(|c| c.to_string()).unwrap_or_default(),
                _ => String::new(),
            })
            .x_desc("drug class")
            .y_desc("genes")
            .draw()?;

        let mut bottoms = vec![0usize; classes.len()];
        for quality in MatchQuality::TIERS {
            let color = tier_color(quality);
            let mut bars = Vec::new();
            for (i, tiers) in counts.values().enumerate() {
                let n = tiers.get(&quality).copied().unwrap_or(0);
                if n == 0 {
                    continue;
                }
                let bottom = bottoms[i];
                bottoms[i] += n;
                bars.push(Rectangle::new(
                    [(SegmentValue::Exact(i), bottom), (SegmentValue::Exact(i + 1), bottom + n)],
                    color.filled(),
                ));
            }
            if bars.is_empty() {
                continue;
            }
            chart
                .draw_series(bars)?
                .label(quality.as_str())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
        }

        chart.configure_series_labels()
            .border_style(&BLACK)
            .background_style(&WHITE.mix(0.8))
            .draw()?;

        root.present()?;
    }
    Ok(svg)
}

/// Blank chart carrying an explanatory caption.
pub fn placeholder_chart(caption: &str) -> Result<String> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, CHART_SIZE).into_drawing_area();
        root.fill(&WHITE)?;
        root.draw(&Text::new(
            caption.to_string(),
            (40, (CHART_SIZE.1 / 2) as i32),
            ("sans-serif", 20).into_font(),
        ))?;
        root.present()?;
    }
    Ok(svg)
}

/// Always yields an image: the chart, or a captioned placeholder when there is
/// nothing to draw or drawing fails.
pub fn drug_class_chart(counts: &ClassQualityCounts) -> String {
    let caption = if counts.is_empty() {
        NO_DATA_CAPTION.to_string()
    } else {
        match plot_drug_class_distribution(counts) {
            Ok(svg) => return svg,
            Err(e) => {
                warn!("Drug class chart failed: {}", e);
                format!("Drug class chart could not be drawn: {}", e)
            }
        }
    };
    captioned_chart(&caption)
}

/// Placeholder carrying `caption`, falling back to hand-written SVG.
pub fn captioned_chart(caption: &str) -> String {
    placeholder_chart(caption).unwrap_or_else(|e| {
        warn!("Placeholder chart failed: {}", e);
        literal_svg(caption)
    })
}

fn literal_svg(caption: &str) -> String {
    format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{}\" height=\"{}\"><text x=\"40\" y=\"{}\">{}</text></svg>",
        CHART_SIZE.0,
        CHART_SIZE.1,
        CHART_SIZE.1 / 2,
        escape(caption)
    )
}
