use std::io::{self, Write};

use color_eyre::eyre::Result;
use log::debug;
use structopt::StructOpt;

use screenmode::platform::SystemCatalog;
use screenmode::{
    list_modes, select_display, set_mode, DisplayError, DisplayMode, ModeCatalog, ModeRequest,
};

/// Query and change the resolution, color depth and refresh rate of the active display
#[derive(StructOpt, Debug)]
#[structopt(name = "screenmode")]
struct Opt {
    /// Index of the active display to operate on
    #[structopt(short, long, default_value = "0")]
    display: usize,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(StructOpt, Debug, PartialEq)]
enum Command {
    /// Print the current mode as WIDTHxHEIGHTxDEPTH@RATE
    Get {
        /// Print the mode as JSON
        #[structopt(long)]
        json: bool,
    },
    /// Print every mode the display supports, one per line
    List {
        /// Print the modes as a JSON array
        #[structopt(long)]
        json: bool,
        /// Append the IOKit flags of each mode
        #[structopt(short, long)]
        verbose: bool,
    },
    /// Switch to a mode given as WIDTHxHEIGHT[xDEPTH[@RATE]]
    Set {
        /// Depth defaults to 32 and the refresh rate to 60
        mode: String,
    },
}

/// `-version` predates the subcommands and is not a valid clap flag, so it is checked by hand
fn is_version_request<I: IntoIterator<Item = String>>(args: I) -> bool {
    args.into_iter().nth(1).as_deref() == Some("-version")
}

fn print_version<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "screenmode version {}", env!("CARGO_PKG_VERSION"))?;
    writeln!(out, "Licensed under GPLv2")
}

fn print_modes<W: Write>(out: &mut W, modes: &[DisplayMode], json: bool, verbose: bool) -> Result<()> {
    if json {
        writeln!(out, "{}", serde_json::to_string(modes)?)?;
        return Ok(());
    }
    for mode in modes {
        if verbose {
            writeln!(out, "{} {}", mode, mode.flags)?;
        } else {
            writeln!(out, "{}", mode)?;
        }
    }
    Ok(())
}

fn run<C: ModeCatalog, W: Write>(catalog: &C, opt: Opt, out: &mut W) -> Result<()> {
    let display = select_display(catalog, opt.display)?;
    debug!("operating on display {} ({})", opt.display, display);

    match opt.cmd {
        Command::Get { json } => {
            let mode = catalog.current_mode(display)?;
            if json {
                writeln!(out, "{}", serde_json::to_string(&mode)?)?;
            } else {
                writeln!(out, "{}", mode)?;
            }
        }
        Command::List { json, verbose } => {
            let modes = list_modes(catalog, display)?;
            print_modes(out, &modes, json, verbose)?;
        }
        Command::Set { mode } => {
            let (request, defaulted) = ModeRequest::parse(&mode).map_err(DisplayError::from)?;
            if let Some(advisory) = defaulted.advisory() {
                writeln!(out, "Warning: {}", advisory)?;
            }
            let applied = set_mode(catalog, display, &request)?;
            writeln!(out, "Set mode on display {} to {}", opt.display, applied)?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    color_eyre::install()?;
    env_logger::init();

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if is_version_request(std::env::args()) {
        print_version(&mut out)?;
        return Ok(());
    }

    let opt = Opt::from_args();
    run(&SystemCatalog::new(), opt, &mut out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use screenmode::memory::MemoryCatalog;
    use screenmode::{ConfigStep, DisplayId, ParseModeError};

    fn opt(args: &[&str]) -> Opt {
        Opt::from_iter_safe(std::iter::once("screenmode").chain(args.iter().copied())).unwrap()
    }

    fn catalog() -> MemoryCatalog {
        let catalog = MemoryCatalog::new(
            vec![DisplayId(1), DisplayId(5)],
            vec![
                DisplayMode::new(1920, 1080, 32, 60.0),
                DisplayMode::new(1280, 720, 32, 60.0),
                DisplayMode::new(1280, 720, 16, 75.0),
            ],
        );
        catalog.set_current(DisplayMode::new(1920, 1080, 32, 60.0));
        catalog
    }

    fn run_to_string(catalog: &MemoryCatalog, args: &[&str]) -> Result<String> {
        let mut out = Vec::new();
        run(catalog, opt(args), &mut out)?;
        Ok(String::from_utf8(out)?)
    }

    #[test]
    fn recognizes_single_dash_version() {
        let args = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert!(is_version_request(args(&["screenmode", "-version"])));
        assert!(!is_version_request(args(&["screenmode", "get"])));
        assert!(!is_version_request(args(&["screenmode"])));

        let mut out = Vec::new();
        print_version(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("screenmode version "));
        assert!(text.ends_with("Licensed under GPLv2\n"));
    }

    #[test]
    fn parses_subcommands() {
        assert_eq!(opt(&["get"]).cmd, Command::Get { json: false });
        assert_eq!(
            opt(&["list", "-v"]).cmd,
            Command::List { json: false, verbose: true }
        );
        let set = opt(&["--display", "1", "set", "1920x1080x32@60"]);
        assert_eq!(set.display, 1);
        assert_eq!(set.cmd, Command::Set { mode: "1920x1080x32@60".to_string() });
    }

    #[test]
    fn rejects_bad_command_lines() {
        let parse = |args: &[&str]| {
            Opt::from_iter_safe(std::iter::once("screenmode").chain(args.iter().copied()))
        };
        assert!(parse(&[]).is_err());
        assert!(parse(&["resize"]).is_err());
        assert!(parse(&["set"]).is_err());
        assert!(parse(&["set", "1920x1080", "extra"]).is_err());
    }

    #[test]
    fn get_prints_current_mode() {
        assert_eq!(run_to_string(&catalog(), &["get"]).unwrap(), "1920x1080x32@60\n");
        assert_eq!(
            run_to_string(&catalog(), &["get", "--json"]).unwrap(),
            "{\"width\":1920,\"height\":1080,\"depth\":32,\"refresh_rate\":60.0}\n"
        );
    }

    #[test]
    fn list_prints_one_mode_per_line() {
        assert_eq!(
            run_to_string(&catalog(), &["list"]).unwrap(),
            "1920x1080x32@60\n1280x720x32@60\n1280x720x16@75\n"
        );
        let verbose = run_to_string(&catalog(), &["list", "--verbose"]).unwrap();
        assert_eq!(verbose.lines().count(), 3);
        assert!(verbose.starts_with("1920x1080x32@60 usable:0 valid:0"));
    }

    #[test]
    fn set_reports_the_applied_mode() {
        let catalog = catalog();
        let output = run_to_string(&catalog, &["--display", "1", "set", "1280x720x16@75"]).unwrap();
        assert_eq!(output, "Set mode on display 1 to 1280x720x16@75\n");
        assert_eq!(catalog.applied(), vec![(DisplayId(5), 2)]);
    }

    #[test]
    fn set_prints_advisory_for_defaults() {
        let output = run_to_string(&catalog(), &["set", "1280x720"]).unwrap();
        assert_eq!(
            output,
            "Warning: no pixel-depth and no refresh rate specified, assuming 32 bit and 60.0Hz.\n\
             Set mode on display 0 to 1280x720x32@60\n"
        );
    }

    #[test]
    fn get_output_reselects_the_same_mode() {
        let catalog = catalog();
        let current = run_to_string(&catalog, &["get"]).unwrap();
        run_to_string(&catalog, &["set", current.trim_end()]).unwrap();
        assert_eq!(catalog.applied(), vec![(DisplayId(1), 0)]);
    }

    #[test]
    fn set_failures_are_errors() {
        let err = run_to_string(&catalog(), &["set", "800x600"]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DisplayError>(),
            Some(DisplayError::ModeNotFound(_))
        ));

        let err = run_to_string(&catalog(), &["set", "bogus"]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DisplayError>(),
            Some(DisplayError::Format(ParseModeError::Unparsable(_)))
        ));

        let err = run_to_string(&catalog(), &["set", "1280x720x16@-75"]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DisplayError>(),
            Some(DisplayError::Format(ParseModeError::InvalidRefreshRate(_)))
        ));

        let failing = catalog();
        failing.fail_at(ConfigStep::Complete, 1000);
        let err = run_to_string(&failing, &["set", "1280x720"]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DisplayError>(),
            Some(DisplayError::Configuration { step: ConfigStep::Complete, .. })
        ));
    }

    #[test]
    fn missing_display_is_an_error() {
        let err = run_to_string(&catalog(), &["--display", "2", "get"]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DisplayError>(),
            Some(DisplayError::DisplayQuery(_))
        ));
    }
}
