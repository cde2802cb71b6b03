use pico_args::Arguments;
use std::path::PathBuf;

macro_rules! define_args {
    (
        $(
            $name:ident ( $flag:expr ) $($required_exists:ident)* : $ty:ty $( = $parser:expr )?
        ),*
    ) => {
        pub struct Args {
            $(pub $name: $ty),*
        }
        impl Args {
            pub fn parse() -> anyhow::Result<Self> {
                Self::parse_from(Arguments::from_env())
            }

            fn parse_from(mut args: Arguments) -> anyhow::Result<Self> {
                macro_rules! parse {
                    (required; $fflag:expr; $pparser:expr) => { args.value_from_fn($fflag, $pparser)? };
                    (required; $fflag:expr;) => { args.value_from_str($fflag)? };
                    (exists; $fflag:expr;) => { args.contains($fflag) };
                    (; $fflag:expr; $pparser:expr) => { args.opt_value_from_fn($fflag, $pparser)? };
                    (; $fflag:expr;) => { args.opt_value_from_str($fflag)? };
                }

                $(
                    let $name = parse!($($required_exists)?; $flag; $($parser)?);
                )*

                let remaining = args.finish();
                anyhow::ensure!(remaining.is_empty(), "unexpected arguments: {remaining:?}");

                Ok(Self {
                    $($name),*
                })
            }
        }
    };
}

// `-i` is checked in `main`, so that `--help` works on its own.
define_args! {
    input("-i"): Option<PathBuf>,
    addr("-x"): Option<u32> = |s| u32::from_str_radix(s.trim_start_matches("0x"), 16),
    headers("--headers") exists: bool,
    sections("--sections") exists: bool,
    check("--check") exists: bool,
    help(["-h", "--help"]) exists: bool
}

pub const USAGE: &str = "\
Usage: cli -i <file.dol> [options]

Options:
  --headers     print the raw BSS range and the entrypoint
  --sections    print the load map
  --check       list every layout problem of the file
  -x <addr>     find the section and file offset of a load address (hex)
  -h, --help    print this message

Log verbosity is controlled through RUST_LOG (default: warn).
";
