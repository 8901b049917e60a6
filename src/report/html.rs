use std::fmt::{self, Write as FmtWrite};

use crate::config::defs::PipelineError;
use crate::report::pdf::{FormattedHit, ReportData, TemplateRenderer};

const STYLE: &str = "\
@page{size:A4;margin:18mm 15mm;}\
body{font-family:Arial,Helvetica,sans-serif;color:#222;font-size:11pt;}\
header{display:flex;align-items:center;border-bottom:2px solid #2e5c8a;margin-bottom:12px;}\
header img{height:48px;margin-right:16px;}\
h1{font-size:20pt;margin:0;}\
h2{font-size:14pt;color:#2e5c8a;margin:18px 0 6px 0;}\
.meta{color:#555;font-size:9pt;}\
table{border-collapse:collapse;width:100%;margin:6px 0 12px 0;}\
th,td{border:1px solid #ddd;padding:4px 8px;text-align:left;font-size:10pt;}\
th{background:#f0f4f8;}\
.summary td{width:25%;}\
.perfect{color:#2e8b57;font-weight:bold;}\
.good{color:#4682b4;font-weight:bold;}\
.partial{color:#d98200;font-weight:bold;}\
.unknown{color:#888;}\
.note{color:#555;font-style:italic;}\
.chart svg{width:100%;height:auto;}";

/// Built-in report template.
#[derive(Debug, Clone, Default)]
pub struct HtmlTemplate;

impl TemplateRenderer for HtmlTemplate {
    fn render(&self, data: &ReportData) -> Result<String, PipelineError> {
        let mut html = String::with_capacity(64 * 1024);
        write_html(&mut html, data)
            .map_err(|e| PipelineError::RenderingFailure(format!("HTML template: {}", e)))?;
        Ok(html)
    }
}

fn write_html(html: &mut String, data: &ReportData) -> fmt::Result {
    writeln!(html, "<!DOCTYPE html>")?;
    writeln!(html, "<html lang=\"en\">")?;
    writeln!(html, "<head>")?;
    writeln!(html, "<meta charset=\"utf-8\"/>")?;
    writeln!(html, "<title>Isolate report: {}</title>", escape(&data.run_name))?;
    writeln!(html, "<style>{}</style>", STYLE)?;
    writeln!(html, "</head>")?;
    writeln!(html, "<body>")?;

    writeln!(html, "<header>")?;
    if let Some(logo) = &data.logo_uri {
        writeln!(html, "<img src=\"{}\" alt=\"logo\"/>", escape(logo))?;
    }
    writeln!(html, "<div><h1>Isolate Analysis Report: {}</h1>", escape(&data.run_name))?;
    writeln!(
        html,
        "<div class=\"meta\">Generated {} by {} {}</div></div>",
        escape(&data.generated),
        escape(&data.tool_name),
        escape(&data.tool_version)
    )?;
    writeln!(html, "</header>")?;

    writeln!(html, "<h2>Input</h2>")?;
    writeln!(html, "<table class=\"summary\">")?;
    writeln!(
        html,
        "<tr><th>File</th><td>{}</td><th>Size</th><td>{}</td></tr>",
        escape(&data.input.file_name),
        escape(&data.input.file_size)
    )?;
    writeln!(
        html,
        "<tr><th>Reads</th><td>{}</td><th>KMA version</th><td>{}</td></tr>",
        escape(&data.input.read_count),
        escape(&data.input.aligner_version)
    )?;
    writeln!(html, "</table>")?;

    writeln!(html, "<h2>Summary</h2>")?;
    writeln!(html, "<table class=\"summary\">")?;
    writeln!(
        html,
        "<tr><th>Species</th><td>{}</td><th>MLST</th><td>{}</td></tr>",
        escape(&data.species_name),
        escape(&data.mlst)
    )?;
    writeln!(
        html,
        "<tr><th>AMR genes</th><td>{}</td><th>Expected phenotypes</th><td>{}</td></tr>",
        data.counts.amr, data.counts.phenotypes
    )?;
    write!(html, "<tr><th>Plasmids</th><td>{}</td>", data.counts.plasmids)?;
    if data.show_virulence {
        writeln!(html, "<th>Virulence genes</th><td>{}</td></tr>", data.counts.virulence)?;
    } else {
        writeln!(html, "<th></th><td></td></tr>")?;
    }
    writeln!(html, "</table>")?;

    writeln!(html, "<h2>Species Identification</h2>")?;
    match &data.species {
        Some(s) => {
            writeln!(html, "<table>")?;
            writeln!(html, "<tr><th>Template</th><th>Identity</th><th>Coverage</th><th>Depth</th><th>Score</th><th>Match</th></tr>")?;
            writeln!(
                html,
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td class=\"{q}\">{q}</td></tr>",
                escape(&s.template),
                escape(&s.identity),
                escape(&s.coverage),
                escape(&s.depth),
                escape(&s.score),
                q = s.quality
            )?;
            writeln!(html, "</table>")?;
        }
        None => writeln!(html, "<p class=\"note\">{}</p>", escape(&data.species_name))?,
    }

    writeln!(html, "<h2>Antimicrobial Resistance Genes</h2>")?;
    hit_table(html, &data.amr_hits, "No AMR genes found")?;

    writeln!(html, "<h2>Expected Phenotypes</h2>")?;
    if let Some(note) = &data.phenotype_note {
        writeln!(html, "<p class=\"note\">{}</p>", escape(note))?;
    } else if data.phenotypes.is_empty() {
        writeln!(html, "<p class=\"note\">No phenotypes expected based on AMR genes.</p>")?;
    } else {
        writeln!(html, "<table>")?;
        writeln!(html, "<tr><th>Drug class</th><th>Phenotypes</th></tr>")?;
        for (class, phenotypes) in &data.phenotypes_by_class {
            writeln!(
                html,
                "<tr><td>{}</td><td>{}</td></tr>",
                escape(class),
                escape(&phenotypes.join(", "))
            )?;
        }
        writeln!(html, "</table>")?;
        writeln!(html, "<p>All: {}</p>", escape(&data.phenotypes.join(", ")))?;
    }
    writeln!(html, "<div class=\"chart\">{}</div>", data.chart_svg)?;

    writeln!(html, "<h2>Plasmids</h2>")?;
    hit_table(html, &data.plasmid_hits, "No plasmids found")?;

    if data.show_virulence {
        writeln!(html, "<h2>Virulence Factors</h2>")?;
        match &data.virulence_note {
            Some(note) if data.virulence_hits.is_empty() => {
                writeln!(html, "<p class=\"note\">{}</p>", escape(note))?
            }
            _ => hit_table(html, &data.virulence_hits, "No virulence genes found")?,
        }
    }

    writeln!(html, "</body>")?;
    writeln!(html, "</html>")
}

fn hit_table(html: &mut String, hits: &[FormattedHit], empty: &str) -> fmt::Result {
    if hits.is_empty() {
        return writeln!(html, "<p class=\"note\">{}</p>", escape(empty));
    }
    writeln!(html, "<table>")?;
    writeln!(html, "<tr><th>Template</th><th>Identity</th><th>Coverage</th><th>Depth</th><th>Match</th></tr>")?;
    for hit in hits {
        writeln!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td class=\"{q}\">{q}</td></tr>",
            escape(&hit.template),
            escape(&hit.identity),
            escape(&hit.coverage),
            escape(&hit.depth),
            q = hit.quality
        )?;
    }
    writeln!(html, "</table>")
}

/// Escapes text for HTML and inline SVG.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::hits::MatchQuality;

    #[test]
    fn test_escape() {
        assert_eq!(escape("aac(6')-Ib <b>"), "aac(6&#39;)-Ib &lt;b&gt;");
    }

    #[test]
    fn test_default_data_renders() -> anyhow::Result<()> {
        let data = ReportData::defaults("run1");
        let html = HtmlTemplate.render(&data)?;
        assert!(html.contains("Isolate Analysis Report: run1"));
        assert!(html.contains("No species identified"));
        assert!(html.contains("Expected phenotypes not available"));
        assert!(!html.contains("No phenotypes expected based on AMR genes."));
        assert!(!html.contains("Virulence Factors"));
        assert!(html.contains("<svg"));
        Ok(())
    }

    #[test]
    fn test_hits_carry_quality_class() -> anyhow::Result<()> {
        let mut data = ReportData::defaults("run2");
        data.amr_hits.push(FormattedHit {
            template: "blaTEM-1B".to_string(),
            identity: "100.00".to_string(),
            coverage: "87.30".to_string(),
            depth: "14.2".to_string(),
            quality: MatchQuality::Good,
        });
        data.show_virulence = true;
        data.virulence_note = Some("No virulence data available (missing)".to_string());
        let html = HtmlTemplate.render(&data)?;
        assert!(html.contains("<td class=\"good\">good</td>"));
        assert!(html.contains("Virulence Factors"));
        assert!(html.contains("No virulence data available (missing)"));
        Ok(())
    }
}
