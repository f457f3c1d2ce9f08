// SPDX: CC0-1.0

use crate::plot::{Annotation, Chart};
use anyhow::Context;
use chrono::{DateTime, Local};
#[cfg(not(debug_assertions))]
use std::process::Stdio;
use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    process::{self, Child},
};
use tracing::info;

fn output_filename(now: DateTime<Local>, ext: &str) -> String {
    format!(
        "{}_output-{}.{}",
        env!("CARGO_PKG_NAME"),
        now.format("%Y-%m-%d_%H-%M-%S%.3f"),
        ext
    )
}

// labels go in double quotes
fn quoted(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

// paths go in single quotes, where only the quote itself needs doubling
fn quoted_path(path: &Path) -> String {
    format!("'{}'", path.display().to_string().replace('\'', "''"))
}

pub fn write_data<W: Write>(mut out: W, chart: &Chart) -> io::Result<()> {
    for p in &chart.curve.points {
        // gnuplot reads NaN as a hole in the line
        writeln!(out, "{} {}", p.x, p.y)?;
    }
    Ok(())
}

pub fn write_script<W: Write>(
    mut out: W,
    chart: &Chart,
    data_path: &Path,
    svg_path: &Path,
    [width, height]: [u32; 2],
) -> io::Result<()> {
    writeln!(out, "reset")?;
    writeln!(out, "set term push")?;
    writeln!(out, "set terminal svg size {width},{height} enhanced")?;
    writeln!(out, "set output {}", quoted_path(svg_path))?;

    writeln!(out, "set title {} noenhanced", quoted(&chart.title))?;
    writeln!(out, "set xlabel {} noenhanced", quoted(&chart.x_label))?;
    writeln!(out, "set ylabel {} noenhanced", quoted(&chart.y_label))?;
    writeln!(
        out,
        "set xrange[{min}:{max}]",
        min = chart.x_range.start,
        max = chart.x_range.end
    )?;
    writeln!(
        out,
        "set yrange[{min}:{max}]",
        min = chart.y_range.start,
        max = chart.y_range.end
    )?;
    writeln!(out, "set grid lc rgb '#cccccc' dt 2")?;
    writeln!(out, "set tics out nomirror")?;
    writeln!(out, "set key box opaque top right")?;

    // annotations as inline data, bands behind the curve and the rest on top
    let mut behind = Vec::new();
    let mut front = vec![format!(
        "{} using 1:2 with lines lw 2 lc rgb '#1f4fbf' title {} noenhanced",
        quoted_path(data_path),
        quoted(&chart.curve.label)
    )];
    for (idx, annotation) in chart.annotations.iter().enumerate() {
        let block = format!("$annotation{idx}");
        writeln!(out, "{block} << EOD")?;
        let (layer, style) = match annotation {
            Annotation::Marker { at, label } => {
                writeln!(out, "{} {}", at.x, at.y)?;
                (
                    &mut front,
                    format!(
                        "with points pt 7 ps 1.5 lc rgb 'red' title {} noenhanced",
                        quoted(label)
                    ),
                )
            }
            Annotation::HLine { y, x, label } => {
                writeln!(out, "{} {y}", x.start)?;
                writeln!(out, "{} {y}", x.end)?;
                (
                    &mut front,
                    format!(
                        "with lines dt 2 lw 1 lc rgb '#d04040' title {} noenhanced",
                        quoted(label)
                    ),
                )
            }
            Annotation::VLine { x, y } => {
                writeln!(out, "{x} {}", y.start)?;
                writeln!(out, "{x} {}", y.end)?;
                (
                    &mut front,
                    String::from("with lines dt 3 lw 1 lc rgb 'gray' notitle"),
                )
            }
            Annotation::Band { x, label } => {
                let (lo, hi) = (chart.y_range.start, chart.y_range.end);
                writeln!(out, "{} {lo} {hi}", x.start)?;
                writeln!(out, "{} {lo} {hi}", x.end)?;
                (
                    &mut behind,
                    format!(
                        "using 1:2:3 with filledcurves fs transparent solid 0.1 noborder lc rgb 'green' title {} noenhanced",
                        quoted(label)
                    ),
                )
            }
        };
        writeln!(out, "EOD")?;
        layer.push(format!("{block} {style}"));
    }

    behind.extend(front);
    writeln!(out, "plot {}", behind.join(", \\\n     "))?;

    // display window
    writeln!(out, "set term pop")?;
    writeln!(out, "replot")?;
    Ok(())
}

/// Renders charts through an external gnuplot process.
#[derive(Debug)]
pub struct Gnuplot {
    program: Option<String>, // None only writes the files
    out_dir: PathBuf,
    res: [u32; 2],
    child: Option<Child>,
}

#[derive(Debug)]
pub struct Rendered {
    pub script: PathBuf,
    pub data: PathBuf,
    pub svg: PathBuf,
    pub spawned: bool,
}

impl Gnuplot {
    pub fn new(program: Option<String>, out_dir: PathBuf, res: [u32; 2]) -> Self {
        Self {
            program,
            out_dir,
            res,
            child: None,
        }
    }

    pub fn show(&mut self, chart: &Chart) -> anyhow::Result<Rendered> {
        let now = Local::now();
        let data_path = self.out_dir.join(output_filename(now, "data"));
        let script_path = self.out_dir.join(output_filename(now, "gnuplot"));
        let svg_path = self.out_dir.join(output_filename(now, "svg"));

        let mut data = BufWriter::new(
            File::create(&data_path).context("failed to open output data file")?,
        );
        write_data(&mut data, chart).context("failed to write to output data file")?;
        data.flush()?;
        data.get_mut().sync_data()?;
        drop(data);

        let mut script = BufWriter::new(
            File::create(&script_path).context("failed to open output gnuplot file")?,
        );
        write_script(&mut script, chart, &data_path, &svg_path, self.res)
            .context("failed to write to output gnuplot file")?;
        script.flush()?;
        script.get_mut().sync_data()?;
        drop(script);

        let rendered = Rendered {
            script: script_path,
            data: data_path,
            svg: svg_path,
            spawned: false,
        };
        let Some(program) = self.program.clone() else {
            info!(script = %rendered.script.display(), "chart written, viewer disabled");
            return Ok(rendered);
        };

        self.close().context("failed to kill previous gnuplot child")?;

        // spawn gnuplot and provide the path to the file
        let mut cmd = process::Command::new(&program);
        cmd.arg("--persist").arg(&rendered.script);
        #[cfg(not(debug_assertions))]
        {
            cmd.stdout(Stdio::null())
                .stderr(Stdio::null())
                .stdin(Stdio::null());
        }
        let child = cmd
            .spawn()
            .with_context(|| format!("failed to spawn {program} (is it installed and in ${{PATH}}?)"))?;
        info!(pid = child.id(), svg = %rendered.svg.display(), "gnuplot spawned");
        self.child = Some(child);

        Ok(Rendered {
            spawned: true,
            ..rendered
        })
    }

    pub fn close(&mut self) -> io::Result<()> {
        if let Some(mut old_child) = self.child.take() {
            if old_child.try_wait()?.is_none() {
                old_child.kill()?;
            }
            old_child.wait()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{limit::SeriesSolver, plot, Neighborhood};

    fn script_in(dir: &str, function_text: &str) -> String {
        let nbhd = Neighborhood::new(0.0, 0.5).unwrap();
        let chart = plot::chart(&SeriesSolver, function_text, &nbhd).unwrap();
        let mut out = Vec::new();
        write_script(
            &mut out,
            &chart,
            &Path::new(dir).join("f.data"),
            &Path::new(dir).join("f.svg"),
            [1000, 600],
        )
        .unwrap();
        String::from_utf8(out).unwrap()
    }

    fn script_for(function_text: &str) -> String {
        script_in("", function_text)
    }

    #[test]
    fn script_has_layout_and_annotations() {
        let script = script_for("sin(x)/x");
        assert!(script.contains("set terminal svg size 1000,600 enhanced"));
        assert!(script.contains("set output 'f.svg'"));
        assert!(script.contains(r#"set title "Limit of f(x) near x = 0" noenhanced"#));
        assert!(script.contains("set xrange[-0.5:0.5]"));
        assert!(script.contains(r#"title "limit L = 1.0000""#));
        assert!(script.contains(r#"title "y = L""#));
        assert!(script.contains("filledcurves"));
        assert!(script.contains(r#"'f.data' using 1:2 with lines"#));
        assert!(script.trim_end().ends_with("replot"));
    }

    #[test]
    fn band_is_plotted_first() {
        let script = script_for("sin(x)/x");
        let plot = script.lines().find(|l| l.starts_with("plot ")).unwrap();
        assert!(plot.contains("filledcurves"));
    }

    #[test]
    fn no_marker_without_finite_limit() {
        let script = script_for("1/x");
        assert!(!script.contains("limit L"));
        assert!(!script.contains("y = L"));
        assert!(script.contains("filledcurves"));
    }

    #[test]
    fn data_marks_holes() {
        let nbhd = Neighborhood::new(0.0, 1.0).unwrap();
        let chart = plot::chart(&SeriesSolver, "ln(x)", &nbhd).unwrap();
        let mut out = Vec::new();
        write_data(&mut out, &chart).unwrap();
        let data = String::from_utf8(out).unwrap();
        assert_eq!(data.lines().count(), chart.curve.points.len());
        assert!(data.lines().next().unwrap().ends_with("NaN"));
        assert!(!data.lines().last().unwrap().ends_with("NaN"));
    }

    #[test]
    fn labels_are_escaped() {
        assert_eq!(quoted(r#"a "b" \c"#), r#""a \"b\" \\c""#);
    }

    #[test]
    fn paths_are_escaped() {
        assert_eq!(quoted_path(Path::new("it's/f.svg")), "'it''s/f.svg'");
        let script = script_in("it's", "sin(x)/x");
        assert!(script.contains("set output 'it''s/f.svg'"));
        assert!(script.contains("'it''s/f.data' using 1:2 with lines"));
    }
}
