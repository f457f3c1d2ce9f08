// SPDX: CC0-1.0

use anyhow::Context;
use limit_explorer::{
    config::Config,
    dialect::{self, SYMBOLIC, USER},
    gnuplot::Gnuplot,
    shell::{self, Command},
    LimitExplorer, Neighborhood, Number,
};
use std::{
    io::{stdout, BufWriter, Write},
    process::ExitCode,
    sync::Arc,
};
use tracing::warn;

fn main() -> ExitCode {
    match try_main() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("unexpected error: {err}");
            let chain = err.chain();
            if chain.len() > 1 {
                eprintln!();
                eprintln!("context:");
                for it in chain.skip(1) {
                    eprintln!("  {it}");
                }
            }
            ExitCode::FAILURE
        }
    }
}

#[derive(Debug)]
struct State {
    function: Arc<String>,
    nbhd: Neighborhood,
    explorer: LimitExplorer,
    viewer: Gnuplot,
    config: Config,
}

fn try_main() -> anyhow::Result<()> {
    let config = Config::from_env().context("failed to read configuration")?;
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(config.log_level)
        .init();

    let nbhd = Neighborhood::new(config.point, config.radius)
        .context("default neighborhood is invalid")?;
    let mut state = State {
        function: Arc::new(config.function.clone()),
        nbhd,
        explorer: LimitExplorer::default(),
        viewer: Gnuplot::new(config.gnuplot.clone(), config.out_dir.clone(), config.res),
        config,
    };

    let mut stdout = BufWriter::new(stdout());
    writeln!(stdout, r#"Limit explorer, try "help" for help"#)?;
    writeln!(stdout)?;
    refresh(&mut stdout, &mut state)?;

    loop {
        writeln!(
            stdout,
            "f(x) = {f}, a = {a}, radius = {r}",
            f = state.function,
            a = state.nbhd.point(),
            r = state.nbhd.radius()
        )?;

        let Some(mut try_cmd) = shell::input(&mut stdout, "> ")? else {
            writeln!(stdout)?;
            break;
        };
        try_cmd.make_ascii_lowercase();
        writeln!(stdout)?;

        if let Ok(cmd) = try_cmd.parse::<Command>() {
            match cmd {
                Command::Help => {
                    for c in Command::exhaustive() {
                        writeln!(stdout, "{name}: {help}", name = c.name(), help = c.help())?;
                    }
                }

                Command::Quit => break,

                Command::SetFunction => {
                    let input = shell::input(&mut stdout, "f(x) = ")?;
                    if let Some(input) = input.filter(|input| !input.is_empty()) {
                        state.function = Arc::new(input);
                        refresh(&mut stdout, &mut state)?;
                    }
                }

                Command::SetPoint => set_point(&mut stdout, &mut state)?,

                Command::SetWindow => set_window(&mut stdout, &mut state)?,

                Command::Left | Command::Right => {
                    let step = state.config.point_step;
                    let step = if cmd == Command::Left { -step } else { step };
                    let point = tidy(state.nbhd.point() + step);
                    move_to(&mut stdout, &mut state, point)?;
                }

                Command::ZoomIn | Command::ZoomOut => {
                    let step = state.config.radius_step;
                    let step = if cmd == Command::ZoomIn { -step } else { step };
                    let radius = state.config.clamp_radius(tidy(state.nbhd.radius() + step));
                    resize(&mut stdout, &mut state, radius)?;
                }

                Command::Limit => print_limit(&mut stdout, &state)?,

                Command::Plot => plot(&mut stdout, &mut state)?,

                Command::PrintProg => {
                    let expr = dialect::to_symbolic_dialect(&state.function);
                    match dialect::compile(&expr, &SYMBOLIC) {
                        Ok(prog) => shell::dump_program(
                            &mut stdout,
                            &prog,
                            format_args!("program for {expr}"),
                        )?,
                        Err(_) => report_parse_err(&mut stdout, &state)?,
                    }
                }

                Command::Examples => {
                    for example in shell::EXAMPLES {
                        writeln!(stdout, "  {example}")?;
                    }
                }

                Command::Guide => writeln!(stdout, "{}", shell::GUIDE)?,
            }
        } else if let Some(similar) = Command::similar(&try_cmd) {
            writeln!(
                stdout,
                r#"Unknown command, did you mean "{}"? Try "help" for help"#,
                similar.name()
            )?;
        } else {
            writeln!(stdout, r#"Unknown command, try "help" for help"#)?;
        }

        writeln!(stdout)?;
    }

    state.viewer.close().context("failed to kill gnuplot child")?;
    stdout.flush()?;
    Ok(())
}

fn set_point<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    writeln!(out, "note: leave blank to skip")?;
    match shell::read_fromstr::<_, Number>(
        &mut out,
        format_args!("?a (is {cur}) = ", cur = state.nbhd.point()),
        true,
    )? {
        Ok(Some(new)) => move_to(&mut out, state, new),
        Ok(None) | Err(_) => Ok(()),
    }
}

fn set_window<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    let bounds = &state.config.radius_bounds;
    writeln!(
        out,
        "note: radius must be between {} and {}, leave blank to skip",
        bounds.start(),
        bounds.end()
    )?;
    match shell::read_fromstr::<_, Number>(
        &mut out,
        format_args!("?radius (is {cur}) = ", cur = state.nbhd.radius()),
        true,
    )? {
        Ok(Some(new)) => match state.config.check_radius(new) {
            Ok(radius) => resize(&mut out, state, radius),
            Err(err) => {
                writeln!(out, "error: {err}")?;
                Ok(())
            }
        },
        Ok(None) | Err(_) => Ok(()),
    }
}

// stepping by 0.1 accumulates float noise
fn tidy(val: Number) -> Number {
    let rounded = (val * 1e9).round() / 1e9;
    if rounded.is_finite() {
        rounded
    } else {
        val
    }
}

fn move_to<W: Write>(mut out: W, state: &mut State, point: Number) -> anyhow::Result<()> {
    match Neighborhood::new(point, state.nbhd.radius()) {
        Ok(nbhd) => {
            state.nbhd = nbhd;
            refresh(&mut out, state)
        }
        Err(err) => {
            writeln!(out, "error: {err}")?;
            Ok(())
        }
    }
}

fn resize<W: Write>(mut out: W, state: &mut State, radius: Number) -> anyhow::Result<()> {
    match Neighborhood::new(state.nbhd.point(), radius) {
        Ok(nbhd) => {
            state.nbhd = nbhd;
            refresh(&mut out, state)
        }
        Err(err) => {
            writeln!(out, "error: {err}")?;
            Ok(())
        }
    }
}

/// Recomputes everything for the current inputs.
fn refresh<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    print_limit(&mut out, state)?;
    plot(&mut out, state)
}

fn print_limit<W: Write>(mut out: W, state: &State) -> anyhow::Result<()> {
    let result = state.explorer.evaluate(&state.function, state.nbhd.point());
    writeln!(
        out,
        "lim_{{x -> {a}}} {f} = {result}",
        a = state.nbhd.point(),
        f = state.function
    )?;
    if result.starts_with("Error:") {
        // the user dialect pinpoints what the solver only describes
        report_parse_err(&mut out, state)
    } else {
        writeln!(out, "formal limit value: {result}")?;
        Ok(())
    }
}

fn report_parse_err<W: Write>(mut out: W, state: &State) -> anyhow::Result<()> {
    let Err(err) = dialect::compile(&state.function, &USER) else {
        return Ok(());
    };
    writeln!(out)?;
    shell::underline(&mut out, &err.loc)?;
    writeln!(out, "parse error: {}", err.typ)?;
    if let Some(note) = shell::parse_note(&err.typ) {
        writeln!(out, "note: {note}")?;
    }
    Ok(())
}

fn plot<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    let chart = match state.explorer.plot(&state.function, &state.nbhd) {
        Ok(chart) => chart,
        Err(err) => {
            warn!(%err, function = %state.function, "no chart");
            writeln!(out, "plot error: {err}")?;
            return Ok(());
        }
    };

    match state.viewer.show(&chart) {
        Ok(rendered) if rendered.spawned => {
            writeln!(out, "plot ok, svg at {}", rendered.svg.display())?;
        }
        Ok(rendered) => {
            writeln!(out, "plot ok, script at {}", rendered.script.display())?;
        }
        Err(err) => {
            // a missing viewer shouldn't end the session
            warn!("rendering failed: {err:#}");
            writeln!(out, "plot error: {err:#}")?;
        }
    }
    Ok(())
}
