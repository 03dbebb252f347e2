use anyhow::Context;
use linecache::{config, host, CacheConfig, ChangeBetweenVersions, EditStats, ScriptVersionCache};
use serde::Deserialize;

const CONFIG_FILE: &str = "linecache.toml";

/// A list of edits applied in order, each against the text the previous one produced:
///
/// ```toml
/// [[edit]]
/// start = 4
/// delete = 2
/// insert = "xy\n"
/// ```
#[derive(Debug, Default, Deserialize)]
struct EditScript {
    #[serde(default, rename = "edit")]
    edits: Vec<ScriptEdit>,
}

#[derive(Debug, Deserialize)]
struct ScriptEdit {
    start: usize,
    #[serde(default)]
    delete: usize,
    #[serde(default)]
    insert: String,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let (Some(path), script_path) = (args.next(), args.next()) else {
        anyhow::bail!("usage: linecache <file> [edit-script.toml]");
    };

    let config: CacheConfig = config::get(std::fs::read_to_string(CONFIG_FILE).ok().as_deref());
    log::debug!("cache config: {config:?}");

    let script = match script_path {
        Some(script_path) => {
            let script = std::fs::read_to_string(&script_path)
                .with_context(|| format!("reading {script_path}"))?;
            toml::from_str::<EditScript>(&script)
                .with_context(|| format!("parsing {script_path}"))?
        }
        None => EditScript::default(),
    };

    let (text, bom) = host::read_file(&path)?;
    let mut cache =
        ScriptVersionCache::from_text_with_observer(&text, config, EditStats::default());
    println!(
        "{path}: {} lines, {} chars, byte order mark: {bom:?}",
        cache.line_count(),
        cache.len_chars()
    );

    for (i, edit) in script.edits.iter().enumerate() {
        let version = cache
            .edit(edit.start, edit.delete, &edit.insert)
            .with_context(|| format!("applying edit #{} {edit:?}", i + 1))?;
        let end = cache.char_offset_to_line_col(edit.start + edit.insert.chars().count())?;
        println!(
            "version {version}: {} lines, {} chars, edit ends at {}:{}",
            cache.line_count(),
            cache.len_chars(),
            end.line,
            end.column
        );
    }

    let current = cache.current_version();
    let oldest = cache.min_version();
    match cache.get_text_changes_between_versions(oldest, current)? {
        ChangeBetweenVersions::Unchanged => println!("no changes since version {oldest}"),
        ChangeBetweenVersions::Changed(change) => {
            println!("changes from version {oldest} to {current}: {change}")
        }
    }
    println!("{}", cache.observer());

    Ok(())
}
