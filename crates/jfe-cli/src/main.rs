use anyhow::{Context, Result, bail};
use clap::{Args as ClapArgs, Parser, Subcommand};
use jfe_core::{DiskStore, Editor, EditorOptions};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "jfe",
    about = "Read and edit JSON files by dotted path (a.b.0.c)",
    version
)]
struct Cli {
    /// Log debug output (ignored when RUST_LOG is set)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Print the value at a path (the whole file without one)
    Get(QueryArgs),
    /// List the keys of an object
    Keys(QueryArgs),
    /// Join an array's elements
    Join(JoinArgs),
    /// Set a value (raw JSON, or a plain string if it does not parse)
    Set(SetArgs),
    /// Remove a value
    Unset(PathArgs),
    /// Append to an array, creating it when missing
    Push(SetArgs),
    /// Prepend to an array, creating it when missing
    Unshift(SetArgs),
    /// Remove the last (or first) element of an array
    Pop(PopArgs),
    /// Remove the array element at an index
    PopAt(PopAtArgs),
    /// Flip a boolean
    Toggle(PathArgs),
    /// Copy a value to another path
    Copy(TwoPathArgs),
    /// Move a value to another path
    Move(TwoPathArgs),
    /// Rename the last segment of a path
    Rename(RenameArgs),
    /// Reset the file to {}
    Empty(FileArgs),
    /// List .json files under a directory
    Ls(LsArgs),
    /// Zip a file or directory next to itself
    Backup(LsArgs),
    /// Create a JSON file (overwriting any existing one)
    New(NewArgs),
    /// Print every .json file under a directory as one object
    CatAll(CatAllArgs),
}

#[derive(ClapArgs, Debug)]
struct FileOpts {
    /// JSON file to edit
    file: PathBuf,
    /// Indent width for written output (0 = compact)
    #[arg(long, default_value_t = 2)]
    indent: usize,
    /// End written output with a newline
    #[arg(long, default_value_t = false)]
    eol: bool,
    /// Use paths as literal top-level keys, dots included
    #[arg(long, default_value_t = false)]
    literal_keys: bool,
    /// Keep changes in memory only (prints the result instead of writing)
    #[arg(long, default_value_t = false)]
    no_autosave: bool,
}

impl FileOpts {
    fn options(&self) -> EditorOptions {
        EditorOptions::default()
            .with_indent_width(self.indent)
            .with_trailing_newline(self.eol)
            .with_literal_keys(self.literal_keys)
            .with_autosave(!self.no_autosave)
    }

    fn open(&self) -> Result<Editor<DiskStore>> {
        jfe_core::edit_file(&self.file, self.options())
            .with_context(|| format!("opening {}", self.file.display()))
    }
}

#[derive(ClapArgs, Debug)]
struct FileArgs {
    #[command(flatten)]
    file: FileOpts,
}

#[derive(ClapArgs, Debug)]
struct QueryArgs {
    #[command(flatten)]
    file: FileOpts,
    /// Dotted path; empty for the whole document
    #[arg(default_value = "")]
    path: String,
    /// Print compact JSON
    #[arg(long, default_value_t = false)]
    compact: bool,
}

#[derive(ClapArgs, Debug)]
struct JoinArgs {
    #[command(flatten)]
    file: FileOpts,
    #[arg(default_value = "")]
    path: String,
    #[arg(long, default_value = ",")]
    joiner: String,
}

#[derive(ClapArgs, Debug)]
struct PathArgs {
    #[command(flatten)]
    file: FileOpts,
    path: String,
}

#[derive(ClapArgs, Debug)]
struct SetArgs {
    #[command(flatten)]
    file: FileOpts,
    path: String,
    /// New value as raw JSON (e.g., 123, true, "str", {"a":1}); anything else is a string
    value: String,
    /// Merge into an existing object instead of replacing it
    #[arg(long, default_value_t = false)]
    merge: bool,
}

#[derive(ClapArgs, Debug)]
struct PopArgs {
    #[command(flatten)]
    file: FileOpts,
    path: String,
    /// Remove the first element instead of the last
    #[arg(long, default_value_t = false)]
    first: bool,
}

#[derive(ClapArgs, Debug)]
struct PopAtArgs {
    #[command(flatten)]
    file: FileOpts,
    path: String,
    index: usize,
}

#[derive(ClapArgs, Debug)]
struct TwoPathArgs {
    #[command(flatten)]
    file: FileOpts,
    from: String,
    to: String,
}

#[derive(ClapArgs, Debug)]
struct RenameArgs {
    #[command(flatten)]
    file: FileOpts,
    path: String,
    new_name: String,
}

#[derive(ClapArgs, Debug)]
struct LsArgs {
    path: PathBuf,
}

#[derive(ClapArgs, Debug)]
struct NewArgs {
    file: PathBuf,
    /// Initial content as raw JSON
    #[arg(default_value = "{}")]
    value: String,
    #[arg(long, default_value_t = 2)]
    indent: usize,
    #[arg(long, default_value_t = false)]
    eol: bool,
}

#[derive(ClapArgs, Debug)]
struct CatAllArgs {
    dir: PathBuf,
    /// Print compact JSON
    #[arg(long, default_value_t = false)]
    compact: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(level.into()));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    match cli.cmd {
        Cmd::Get(a) => cmd_get(a),
        Cmd::Keys(a) => cmd_keys(a),
        Cmd::Join(a) => cmd_join(a),
        Cmd::Set(a) => cmd_set(a),
        Cmd::Unset(a) => edit(&a.file, |ed| ed.unset(&a.path).map(drop)),
        Cmd::Push(a) => edit(&a.file, |ed| ed.push(&a.path, parse_value(&a.value)).map(drop)),
        Cmd::Unshift(a) => edit(&a.file, |ed| ed.unshift(&a.path, parse_value(&a.value)).map(drop)),
        Cmd::Pop(a) => edit(&a.file, |ed| {
            let popped = if a.first { ed.pop_first(&a.path) } else { ed.pop_last(&a.path) };
            popped.map(drop)
        }),
        Cmd::PopAt(a) => edit(&a.file, |ed| ed.pop_to(&a.path, a.index).map(drop)),
        Cmd::Toggle(a) => edit(&a.file, |ed| ed.trigger(&a.path).map(drop)),
        Cmd::Copy(a) => edit(&a.file, |ed| ed.copy(&a.from, &a.to).map(drop)),
        Cmd::Move(a) => edit(&a.file, |ed| ed.move_to(&a.from, &a.to).map(drop)),
        Cmd::Rename(a) => edit(&a.file, |ed| ed.rename(&a.path, &a.new_name).map(drop)),
        Cmd::Empty(a) => cmd_empty(a),
        Cmd::Ls(a) => cmd_ls(a),
        Cmd::Backup(a) => cmd_backup(a),
        Cmd::New(a) => cmd_new(a),
        Cmd::CatAll(a) => cmd_cat_all(a),
    }
}

fn parse_value(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}

// Open, apply one edit (autosaved unless --no-autosave, which prints the result instead).
fn edit(
    file: &FileOpts,
    f: impl FnOnce(&mut Editor<DiskStore>) -> jfe_core::Result<()>,
) -> Result<()> {
    let mut ed = file.open()?;
    f(&mut ed)?;
    if file.no_autosave {
        println!("{}", ed.to_json_string(true)?);
    }
    Ok(())
}

fn cmd_get(args: QueryArgs) -> Result<()> {
    let ed = args.file.open()?;
    match ed.get(&args.path) {
        Some(v) if args.compact => println!("{}", serde_json::to_string(&v)?),
        Some(v) => println!("{}", serde_json::to_string_pretty(&v)?),
        None => bail!("not found: {}", args.path),
    }
    Ok(())
}

fn cmd_keys(args: QueryArgs) -> Result<()> {
    let ed = args.file.open()?;
    for k in ed.get_keys(&args.path)? {
        println!("{k}");
    }
    Ok(())
}

fn cmd_join(args: JoinArgs) -> Result<()> {
    let ed = args.file.open()?;
    println!("{}", ed.array_to_string(&args.path, &args.joiner)?);
    Ok(())
}

fn cmd_set(args: SetArgs) -> Result<()> {
    let opts = jfe_core::SetOptions {
        merge: args.merge,
        ..Default::default()
    };
    edit(&args.file, |ed| {
        ed.set_with(&args.path, parse_value(&args.value), opts).map(drop)
    })
}

fn cmd_empty(args: FileArgs) -> Result<()> {
    let mut ed = args.file.open()?;
    if args.file.no_autosave {
        println!("{{}}");
        return Ok(());
    }
    ed.empty()?;
    Ok(())
}

fn cmd_ls(args: LsArgs) -> Result<()> {
    for p in jfe_core::find_json_files(&args.path)? {
        println!("{}", p.display());
    }
    Ok(())
}

fn cmd_backup(args: LsArgs) -> Result<()> {
    let dest = jfe_core::zip_backup(&args.path)?;
    println!("{}", dest.display());
    Ok(())
}

fn cmd_new(args: NewArgs) -> Result<()> {
    let initial: serde_json::Value = serde_json::from_str(&args.value)
        .with_context(|| format!("initial value is not JSON: {}", args.value))?;
    let opts = EditorOptions::default()
        .with_indent_width(args.indent)
        .with_trailing_newline(args.eol);
    jfe_core::create_file(&args.file, initial, opts)
        .with_context(|| format!("creating {}", args.file.display()))?;
    Ok(())
}

fn cmd_cat_all(args: CatAllArgs) -> Result<()> {
    let all = serde_json::Value::Object(jfe_core::read_all_json(&args.dir)?);
    if args.compact {
        println!("{}", serde_json::to_string(&all)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&all)?);
    }
    Ok(())
}
