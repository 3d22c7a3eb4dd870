//! wix-comreg CLI - harvest COM registration metadata from a binary

use clap::Parser;
use std::path::PathBuf;
use wix_comreg::{
    BuildContext, ComHarvestOptions, ComHarvester, HeatTool, TargetContext, WxsElement,
};

#[derive(Parser)]
#[command(name = "wix-comreg")]
#[command(about = "Harvest COM registration metadata from DLL/OCX binaries into WXS fragments")]
#[command(version)]
struct Cli {
    /// Binary to register (DLL/OCX)
    source: PathBuf,

    /// File element Id (default: derived from the file name)
    #[arg(long)]
    file_id: Option<String>,

    /// Component element Id (default: "<file-id>_comp")
    #[arg(long)]
    component_id: Option<String>,

    /// Parent Directory Id
    #[arg(short = 'd', long, default_value = "INSTALLDIR")]
    directory_id: String,

    /// Directory for the temporary .wxs fragment
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,

    /// Emit rich COM/TypeLib elements instead of plain registry values
    #[arg(long)]
    com_objects: bool,

    /// Drop the baseline heat arguments
    #[arg(long)]
    no_defaults: bool,

    /// Suppress heat warning output
    #[arg(long)]
    hide_warnings: bool,

    /// Extra heat arguments (can be used multiple times)
    #[arg(short = 'a', long = "arg")]
    extra_args: Vec<String>,

    /// Keep the temporary .wxs fragment
    #[arg(long)]
    keep_temp: bool,

    /// Path to the heat binary (default: found on PATH)
    #[arg(long)]
    heat: Option<PathBuf>,

    /// Print the heat command line without running it
    #[arg(long)]
    show_args: bool,

    /// Output as JSON instead of WXS
    #[arg(long)]
    json: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let file_name = match cli.source.file_name() {
        Some(name) => name.to_string_lossy().to_string(),
        None => {
            eprintln!("Invalid source path: {}", cli.source.display());
            std::process::exit(1);
        }
    };

    let file_id = cli.file_id.unwrap_or_else(|| sanitize_id(&file_name));
    let component_id = cli
        .component_id
        .unwrap_or_else(|| format!("{}_comp", file_id));

    let options = ComHarvestOptions {
        create_com_objects: cli.com_objects,
        override_defaults: cli.no_defaults,
        hide_warnings: cli.hide_warnings,
        extra_arguments: cli.extra_args,
        ..Default::default()
    };

    let tool = match cli.heat {
        Some(path) => HeatTool::at(path),
        None => match HeatTool::detect() {
            Ok(tool) => tool,
            Err(e) => {
                eprintln!("{}", e);
                std::process::exit(1);
            }
        },
    };

    let ctx = BuildContext::new(".", &cli.out_dir)
        .preserve_temp_files(cli.keep_temp);

    if cli.show_args {
        let source = ctx.resolve_source(&cli.source.display().to_string());
        let output = ctx.output_path_for(&source);
        println!("{}", tool.command_line(&source, &output, &options));
        return;
    }

    let mut file = WxsElement::new("File")
        .with_attr("Id", file_id)
        .with_attr("Source", cli.source.display().to_string());
    let mut component = WxsElement::new("Component")
        .with_attr("Id", component_id)
        .with_attr("Guid", "*");

    let harvester = ComHarvester::with_options(tool, options);
    let result = harvester.register(
        &ctx,
        TargetContext {
            file: &mut file,
            component: &mut component,
            directory_id: &cli.directory_id,
        },
    );

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    // Print the Component with its enriched File child in place
    component.children.insert(0, file);

    let entries = count_elements(&component) - 2;
    eprintln!("Registered {} entries for {}", entries, file_name);

    if cli.json {
        match serde_json::to_string_pretty(&component) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Failed to serialize result: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        print!("{}", component.to_wxs());
    }
}

fn sanitize_id(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

fn count_elements(element: &WxsElement) -> usize {
    1 + element.children.iter().map(count_elements).sum::<usize>()
}
