use std::{env, process::ExitCode};

use javelin_class_file::{ClassFile, DecoderConfig};
use log::LevelFilter;

fn main() -> ExitCode {
    let args = env::args().collect::<Vec<_>>();
    let program = args.first().map(String::as_str).unwrap_or("javelin");

    let (debug, path) = match &args[..] {
        [_, path] => (false, path),
        [_, flag, path] if flag == "-d" => (true, path),
        _ => {
            print_usage(program);
            return ExitCode::FAILURE;
        }
    };

    init_logger(debug);

    let config = DecoderConfig::default().with_debug(debug);
    let class_file = match ClassFile::open(path, &config) {
        Ok(class_file) => class_file,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Failed to read class file: {}", path);
            return ExitCode::FAILURE;
        }
    };

    let (major, minor) = class_file.version();
    println!("Class file: {}", path);
    println!("Magic: 0x{:08X}", class_file.magic());
    println!("Version: {}.{}", major, minor);
    println!("Constant pool entries: {}", class_file.constant_pool_count());
    println!("Methods: {}", class_file.methods_count());

    class_file.release();
    ExitCode::SUCCESS
}

fn init_logger(debug: bool) {
    let mut builder = pretty_env_logger::formatted_builder();
    builder.filter_level(LevelFilter::Warn);
    if let Ok(filters) = env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    if debug {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.init();
}

fn print_usage(program: &str) {
    println!("Usage: {} [-d] <class file>", program);
    println!("Options:");
    println!("  -d    Enable debug output");
}
