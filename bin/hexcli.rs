use std::env;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process;

use hexreclib::{AnyFile, FormatKind, HexRecError, guess_format_name};

const EXIT_USAGE: i32 = 1;
const EXIT_IO: i32 = 2;
const EXIT_DATA: i32 = 3;

enum CliError {
    Usage(String),
    Io(String),
    Data(String),
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) => EXIT_USAGE,
            Self::Io(_) => EXIT_IO,
            Self::Data(_) => EXIT_DATA,
        }
    }

    fn message(&self) -> &str {
        match self {
            Self::Usage(msg) | Self::Io(msg) | Self::Data(msg) => msg,
        }
    }
}

fn print_usage() {
    let version = env!("CARGO_PKG_VERSION");

    println!(" ------------------------------------------------");
    println!("|  Hex Record Utility  | v{version}                  |");
    println!(" ------------------------------------------------");
    println!("\nUsage:");
    println!("  hexcli info <input>");
    println!("  hexcli print <input>");
    println!("  hexcli validate <input>");
    println!("  hexcli convert <input> <output>");
    println!("  hexcli merge <output> <input1> ... <inputN>");
    println!("  hexcli crop <input> <output> -s <addr> -e <addr>");
    println!("  hexcli clear <input> <output> [-s <addr>] [-e <addr>]");
    println!("  hexcli delete <input> <output> [-s <addr>] [-e <addr>]");
    println!("  hexcli fill <input> <output> -v <bytes> [-s <addr>] [-e <addr>]");
    println!("  hexcli flood <input> <output> -v <bytes> [-s <addr>] [-e <addr>]");
    println!("  hexcli shift <input> <output> -v <offset>");
    println!("  hexcli find <input> -v <bytes>");
    println!("\nOptions:");
    println!("  -i, --input-format <name>    Input format (default: guessed)");
    println!("  -o, --output-format <name>   Output format (default: guessed)");
    println!("  -s, --start <addr>           Inclusive range start (hex)");
    println!("  -e, --end <addr>             Exclusive range end (hex)");
    println!("  -v, --value <val>            Byte pattern / amount (hex)");
    println!("\nThe path '-' denotes standard input/output.");
    println!("Formats: ihex srec titxt tek xtek mos avr asciihex raw");
}

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(EXIT_USAGE);
    }

    if let Err(error) = run_dispatch(&args[1], &args) {
        eprintln!("Error: {}", error.message());
        process::exit(error.exit_code());
    }
}

fn run_dispatch(command: &str, args: &[String]) -> Result<(), CliError> {
    match command {
        "help" | "-h" | "--help" => {
            print_usage();
            Ok(())
        }
        "info" => run_info(args),
        "print" => run_print(args),
        "validate" => run_validate(args),
        "convert" => run_convert(args),
        "merge" => run_merge(args),
        "crop" | "clear" | "delete" | "fill" | "flood" | "shift" => run_edit(command, args),
        "find" => run_find(args),
        _ => {
            print_usage();
            Err(CliError::Usage(format!("Unknown command: {command}")))
        }
    }
}

fn run_info(args: &[String]) -> Result<(), CliError> {
    // Guard: check input path argument
    let in_path = positional(args, 0).ok_or_else(|| missing("input path"))?;
    let mut file = load_input(&in_path, input_format(args)?)?;

    println!("Format:      {}", file.format_kind().name());
    println!("Data Size:   {} bytes", file.image().byte_len());
    match (file.image().start(), file.image().end()) {
        (Some(start), Some(end)) => {
            println!("Range:       0x{start:08X} - 0x{end:08X}");
        }
        _ => println!("Range:       (empty)"),
    }
    println!("Blocks:      {}", file.image().spans().len());
    if let Some(start_address) = file.start_address() {
        println!("Start Addr:  0x{start_address:08X}");
    }
    for warning in file.warnings() {
        println!("Warning:     {warning}");
    }
    Ok(())
}

fn run_print(args: &[String]) -> Result<(), CliError> {
    let in_path = positional(args, 0).ok_or_else(|| missing("input path"))?;
    let mut file = load_input(&in_path, input_format(args)?)?;

    let bytes = file
        .to_bytes()
        .map_err(|error| CliError::Data(error.to_string()))?;
    std::io::stdout()
        .write_all(&bytes)
        .map_err(|error| CliError::Io(error.to_string()))?;
    Ok(())
}

fn run_validate(args: &[String]) -> Result<(), CliError> {
    let in_path = positional(args, 0).ok_or_else(|| missing("input path"))?;
    let mut file = load_input(&in_path, input_format(args)?)?;

    file.validate()
        .map_err(|error| CliError::Data(error.to_string()))?;
    for warning in file.warnings() {
        println!("Warning: {warning}");
    }
    println!("OK");
    Ok(())
}

fn run_convert(args: &[String]) -> Result<(), CliError> {
    // Guard: check both path arguments
    let in_path = positional(args, 0).ok_or_else(|| missing("input path"))?;
    let out_path = positional(args, 1).ok_or_else(|| missing("output path"))?;

    let mut file = load_input(&in_path, input_format(args)?)?;
    let out_kind = output_kind(args, &out_path)?;
    let mut out_file = file.convert(out_kind);
    write_output(&mut out_file, &out_path)
}

fn run_merge(args: &[String]) -> Result<(), CliError> {
    // Guard: at least one output and two inputs
    if positional_count(args) < 3 {
        return Err(CliError::Usage(
            "Usage: hexcli merge <output> <input1> ... <inputN>".to_string(),
        ));
    }

    let out_path = positional(args, 0).ok_or_else(|| missing("output path"))?;
    let out_kind = output_kind(args, &out_path)?;
    let mut out_file = AnyFile::from_image(out_kind, hexreclib::SparseImage::new());

    let mut index = 1;
    while let Some(in_path) = positional(args, index) {
        let mut in_file = load_input(&in_path, None)?;
        out_file
            .merge_from(&mut in_file)
            .map_err(|error| CliError::Data(error.to_string()))?;
        index += 1;
    }

    write_output(&mut out_file, &out_path)
}

fn run_edit(command: &str, args: &[String]) -> Result<(), CliError> {
    let in_path = positional(args, 0).ok_or_else(|| missing("input path"))?;
    let out_path = positional(args, 1).ok_or_else(|| missing("output path"))?;

    let mut file = load_input(&in_path, input_format(args)?)?;
    let start = flag_address(args, "-s", "--start")?;
    let end = flag_address(args, "-e", "--end")?;

    let result = match command {
        "crop" => file.crop(start, end),
        "clear" | "delete" => file.clear(start, end),
        "fill" => file.fill(start, end, &flag_pattern(args)?),
        "flood" => file.flood(start, end, &flag_pattern(args)?),
        "shift" => {
            let value = get_flag_value(args, "-v")
                .or_else(|| get_flag_value(args, "--value"))
                .ok_or_else(|| missing("'-v' shift offset"))?;
            let offset = parse_signed_hex(&value)
                .map_err(|()| CliError::Usage(format!("Invalid offset: {value}")))?;
            file.shift(offset)
        }
        _ => unreachable!("checked by dispatch"),
    };
    result.map_err(|error| CliError::Data(error.to_string()))?;

    let out_kind = output_kind(args, &out_path)?;
    let mut out_file = file.convert(out_kind);
    write_output(&mut out_file, &out_path)
}

fn run_find(args: &[String]) -> Result<(), CliError> {
    let in_path = positional(args, 0).ok_or_else(|| missing("input path"))?;
    let mut file = load_input(&in_path, input_format(args)?)?;

    let pattern = flag_pattern(args)?;
    let start = flag_address(args, "-s", "--start")?;
    let end = flag_address(args, "-e", "--end")?;

    let address = file
        .find(&pattern, start, end)
        .map_err(|error| CliError::Data(error.to_string()))?;
    println!("0x{address:08X}");
    Ok(())
}

// =============================== HELPER FUNCTIONS ===============================

/// Reads a record file from a path or standard input ('-').
fn load_input(path: &str, format: Option<FormatKind>) -> Result<AnyFile, CliError> {
    if path == "-" {
        let mut bytes = Vec::new();
        std::io::stdin()
            .read_to_end(&mut bytes)
            .map_err(|error| CliError::Io(error.to_string()))?;
        let file = match format {
            Some(kind) => AnyFile::parse(kind, &bytes),
            None => AnyFile::sniff(&bytes),
        };
        return file.map_err(|error| CliError::Data(error.to_string()));
    }

    // Guard: file must exist
    let path_buf = PathBuf::from(path);
    if !path_buf.is_file() {
        return Err(CliError::Io(format!("File not found: {path}")));
    }

    hexreclib::load(&path_buf, format).map_err(|error| {
        if error.downcast_ref::<HexRecError>().is_some() {
            CliError::Data(error.to_string())
        } else {
            CliError::Io(error.to_string())
        }
    })
}

/// Writes a record file to a path or standard output ('-').
fn write_output(file: &mut AnyFile, path: &str) -> Result<(), CliError> {
    let bytes = file
        .to_bytes()
        .map_err(|error| CliError::Data(error.to_string()))?;

    if path == "-" {
        std::io::stdout()
            .write_all(&bytes)
            .map_err(|error| CliError::Io(error.to_string()))
    } else {
        std::fs::write(path, bytes).map_err(|error| CliError::Io(error.to_string()))
    }
}

fn input_format(args: &[String]) -> Result<Option<FormatKind>, CliError> {
    parse_format_flag(args, "-i", "--input-format")
}

/// Output format: explicit flag first, then the output path extension.
fn output_kind(args: &[String], out_path: &str) -> Result<FormatKind, CliError> {
    if let Some(kind) = parse_format_flag(args, "-o", "--output-format")? {
        return Ok(kind);
    }
    if out_path == "-" {
        return Err(CliError::Usage(
            "Writing to stdout requires '-o <format>'".to_string(),
        ));
    }
    guess_format_name(Path::new(out_path))
        .map_err(|error| CliError::Usage(error.to_string()))
}

fn parse_format_flag(
    args: &[String],
    short: &str,
    long: &str,
) -> Result<Option<FormatKind>, CliError> {
    let Some(name) = get_flag_value(args, short).or_else(|| get_flag_value(args, long)) else {
        return Ok(None);
    };
    FormatKind::from_name(&name)
        .map(Some)
        .map_err(|_| CliError::Usage(format!("Unknown format: {name}")))
}

fn flag_address(args: &[String], short: &str, long: &str) -> Result<Option<u64>, CliError> {
    let Some(value) = get_flag_value(args, short).or_else(|| get_flag_value(args, long)) else {
        return Ok(None);
    };
    parse_hex_str(&value)
        .map(Some)
        .map_err(|()| CliError::Usage(format!("Invalid address: {value}")))
}

/// The '-v' byte pattern, e.g. "FF" or "DEAD".
fn flag_pattern(args: &[String]) -> Result<Vec<u8>, CliError> {
    let value = get_flag_value(args, "-v")
        .or_else(|| get_flag_value(args, "--value"))
        .ok_or_else(|| missing("'-v' byte value"))?;

    let text = value.trim().trim_start_matches("0x").trim_start_matches("0X");
    if text.is_empty() || text.len() % 2 != 0 || !text.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(CliError::Usage(format!("Invalid byte value: {value}")));
    }
    Ok((0..text.len())
        .step_by(2)
        .filter_map(|i| u8::from_str_radix(&text[i..i + 2], 16).ok())
        .collect())
}

/// Parse a string as a hex number (with optional 0x prefix).
fn parse_hex_str(text: &str) -> Result<u64, ()> {
    let text = text.trim();
    let text = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    u64::from_str_radix(text, 16).map_err(|_| ())
}

fn parse_signed_hex(text: &str) -> Result<i64, ()> {
    let text = text.trim();
    if let Some(negative) = text.strip_prefix('-') {
        let value = parse_hex_str(negative)?;
        i64::try_from(value).map(|value| -value).map_err(|_| ())
    } else {
        let value = parse_hex_str(text)?;
        i64::try_from(value).map_err(|_| ())
    }
}

/// Find the value right after a specific flag (e.g. "-v FF").
fn get_flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|arg| arg == flag)
        .and_then(|position| args.get(position + 1))
        .cloned()
}

/// The n-th positional argument after the subcommand, skipping flags and
/// their values.
fn positional(args: &[String], index: usize) -> Option<String> {
    positionals(args).nth(index)
}

fn missing(what: &str) -> CliError {
    CliError::Usage(format!("Missing {what}"))
}

fn positional_count(args: &[String]) -> usize {
    positionals(args).count()
}

fn positionals(args: &[String]) -> impl Iterator<Item = String> + '_ {
    let mut skip_next = true; // skip the subcommand itself
    let mut skip_value = false;
    args.iter().skip(1).filter_map(move |arg| {
        if skip_next {
            skip_next = false;
            return None;
        }
        if skip_value {
            skip_value = false;
            return None;
        }
        if arg.starts_with('-') && arg.len() > 1 {
            skip_value = true;
            return None;
        }
        Some(arg.clone())
    })
}
