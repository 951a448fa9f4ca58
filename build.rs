// build.rs
//
// Compiles `locales/*.toml` into a `t!("key")` macro that expands to a string
// literal, so messages can be used as `format!`/`log!` format strings.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;

const BASE_LOCALE: &str = "en";

type Messages = BTreeMap<String, String>;

fn main() {
    let lang = effective_language();
    println!("cargo:rustc-env=RUN_SHELL_LANG_EFFECTIVE={}", lang);
    println!("cargo:rerun-if-env-changed=RUN_SHELL_LANG");
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=locales/");

    let messages = messages_for(&lang);

    let out_dir = env::var("OUT_DIR").expect("cargo sets OUT_DIR for build scripts");
    fs::write(Path::new(&out_dir).join("translations.rs"), render_macro(&messages))
        .expect("could not write translations.rs to OUT_DIR");
}

/// A `lang_*` feature wins (the alphabetically first, if several are on),
/// then `RUN_SHELL_LANG`, then English.
fn effective_language() -> String {
    let mut features: Vec<String> = env::vars()
        .filter_map(|(key, _)| {
            key.strip_prefix("CARGO_FEATURE_LANG_")
                .map(str::to_lowercase)
        })
        .collect();
    features.sort();

    match features.as_slice() {
        [] => env::var("RUN_SHELL_LANG").unwrap_or_else(|_| BASE_LOCALE.to_string()),
        [only] => only.clone(),
        [first, ..] => {
            println!(
                "cargo:warning=Several lang_* features are enabled ({:?}); using '{}'.",
                features, first
            );
            first.clone()
        }
    }
}

/// English messages with the chosen language laid over them, so a key the
/// translation lacks still has text.
fn messages_for(lang: &str) -> Messages {
    let mut messages = read_locale(BASE_LOCALE)
        .unwrap_or_else(|| panic!("locales/{}.toml is required", BASE_LOCALE));

    if lang != BASE_LOCALE {
        match read_locale(lang) {
            Some(overrides) => messages.extend(overrides),
            None => println!(
                "cargo:warning=No locales/{}.toml; messages stay in English.",
                lang
            ),
        }
    }
    messages
}

fn read_locale(lang: &str) -> Option<Messages> {
    let path = format!("locales/{}.toml", lang);
    let content = fs::read_to_string(&path).ok()?;
    Some(toml::from_str(&content).unwrap_or_else(|e| panic!("{} is not valid TOML: {}", path, e)))
}

/// One literal arm per key; an unknown key is a compile error at the call site.
fn render_macro(messages: &Messages) -> String {
    let mut code = String::from("#[macro_export]\nmacro_rules! t {\n");
    for (key, text) in messages {
        code.push_str(&format!("    ({:?}) => {{ {:?} }};\n", key, text));
    }
    code.push_str(
        "    ($key:expr) => {{ compile_error!(concat!(\"Missing translation key: \", $key)) }};\n",
    );
    code.push_str("}\n");
    code
}
