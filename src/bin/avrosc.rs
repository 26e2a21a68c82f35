//! Command-line driver for the specific-type generator
//!
//! `avrosc generate [--output-path=<dir>] [--filename-prefix=<pfx>]
//! [--type-prefix=<pfx>] <schema-file>...` reads each schema file, runs
//! the generator and writes the emitted files. Processing stops at the
//! first failing file, with an error block on stderr and exit code 1.

use avro_specific::{
	schema::SchemaMut,
	specific::{generate, GeneratorConfig},
};

use {
	clap::Parser,
	std::path::{Path, PathBuf},
};

#[derive(Parser)]
#[command(name = "avrosc", about = "Generate specific Rust layouts from schema files")]
struct Cli {
	#[command(subcommand)]
	command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
	/// Generate specific-type source files from one or more schema files
	Generate(GenerateArgs),
}

#[derive(clap::Args)]
struct GenerateArgs {
	/// Directory the generated files are written to
	#[arg(long, default_value = ".")]
	output_path: PathBuf,

	/// Prefix for generated file names
	#[arg(long, default_value = "specific_")]
	filename_prefix: String,

	/// Prefix for generated type names
	#[arg(long, default_value = "")]
	type_prefix: String,

	/// Schema files to process
	#[arg(required = true)]
	schema_files: Vec<PathBuf>,
}

fn main() {
	let cli = match Cli::try_parse() {
		Ok(cli) => cli,
		Err(e) => {
			// clap's default exit code for usage errors is 2; ours is 1
			let _ = e.print();
			std::process::exit(1);
		}
	};

	match cli.command {
		Command::Generate(args) => {
			for schema_file in &args.schema_files {
				if let Err(e) = process_schema_file(schema_file, &args) {
					eprint!(
						"Error processing schema {}:\n  {}\n",
						schema_file.display(),
						e
					);
					std::process::exit(1);
				}
			}
		}
	}
}

fn process_schema_file(
	schema_file: &Path,
	args: &GenerateArgs,
) -> Result<(), Box<dyn std::error::Error>> {
	let schema_json = std::fs::read_to_string(schema_file)?;
	let schema: SchemaMut = schema_json.parse()?;

	let config = GeneratorConfig {
		type_prefix: args.type_prefix.clone(),
		filename_prefix: args.filename_prefix.clone(),
	};
	let files = generate(&schema, &config)?;

	for file in files {
		std::fs::write(args.output_path.join(&file.name), file.contents)?;
	}
	Ok(())
}
