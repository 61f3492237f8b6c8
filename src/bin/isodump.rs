use anyhow::Context;
use clap::{ArgAction, Parser};
use isobox::{
    FourCC, ParseOptions, analyze_file,
    report::{json_tree, payloads, render_text},
    util::hex_dump,
};

#[derive(Parser, Debug)]
#[command(version, about = "ISOBMFF/MP4 box tree dumper")]
struct Args {
    /// MP4/ISOBMFF file path
    path: String,

    /// Emit JSON instead of a human-readable tree
    #[arg(long, action = ArgAction::SetTrue, conflicts_with = "raw")]
    json: bool,

    /// Deepest nesting accepted while parsing and shown in the text tree
    #[arg(long, default_value_t = 64)]
    max_depth: usize,

    /// Skip undecoded trailing bytes instead of failing
    #[arg(long, action = ArgAction::SetTrue)]
    lenient: bool,

    /// Hex-dump the payload of every box with this 4CC (e.g. --raw stsd)
    #[arg(long = "raw")]
    raw: Option<String>,

    /// Bytes to show per raw dump (0 means the entire payload)
    #[arg(long, default_value_t = 0)]
    bytes: usize,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let options = ParseOptions {
        max_depth: args.max_depth,
        strict: !args.lenient,
    };
    let analysis = analyze_file(&args.path, options)?;
    let tree = &analysis.tree;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&json_tree(tree))?);
        return Ok(());
    }

    print!("{}", render_text(tree, args.max_depth));

    if let Some(sel) = args.raw.as_deref() {
        let tag = FourCC::new(sel).with_context(|| format!("'{sel}' is not a 4CC"))?;
        for (i, (b, payload)) in payloads(tree, &analysis.data, tag).into_iter().enumerate() {
            let to_show = if args.bytes == 0 {
                payload
            } else {
                &payload[..payload.len().min(args.bytes)]
            };
            let off = b.header().start + b.header().header_size;
            println!(
                "\n== Dump {} ({}) payload: offset={:#x}, len={} ==",
                i,
                tag,
                off,
                to_show.len()
            );
            print!("{}", hex_dump(to_show, off));
        }
    }

    Ok(())
}
