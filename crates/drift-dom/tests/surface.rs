//! Memory surface integration tests

use drift_dom::css::{self, BASE_BG_COLOR};
use drift_dom::{MemorySurface, Surface};

const SHELL: &str = r#"
    <nav><a id="navbar__logo">logo</a><a class="hidden-link" data-dialog="projects">Projects</a></nav>
    <input class="search-input" type="text">
"#;

// ============================================================================
// Shell and content regions
// ============================================================================

#[test]
fn test_shell_survives_content_swaps() {
    let mut surface = MemorySurface::with_shell(SHELL);
    let shell_keys: Vec<_> = surface.shell_elements().iter().map(|e| e.key).collect();

    surface.set_content(r#"<div class="main__content"><a data-dialog="home">home</a></div>"#);
    surface.set_content(r#"<div class="main__content"><p>two</p></div>"#);

    let after: Vec<_> = surface.shell_elements().iter().map(|e| e.key).collect();
    assert_eq!(shell_keys, after);
    assert!(surface.find_by_id("navbar__logo").is_some());
    assert!(surface.content_elements().iter().all(|e| !shell_keys.contains(&e.key)));
}

#[test]
fn test_mutators_reach_both_regions() {
    let mut surface = MemorySurface::with_shell(SHELL);
    surface.set_content(r#"<input name="speed" type="range">"#);

    let search = surface.shell_elements().into_iter().find(|e| e.has_class("search-input")).unwrap();
    let speed = surface.content_elements()[0].clone();

    assert!(surface.add_class(search.key, "search-input--error"));
    assert!(surface.set_value(speed.key, "3"));
    assert!(surface.element(search.key).unwrap().has_class("search-input--error"));
    assert_eq!(surface.element(speed.key).unwrap().value(), Some("3"));

    surface.set_content("");
    assert!(!surface.set_value(speed.key, "4"));
}

// ============================================================================
// Custom property protocol
// ============================================================================

#[test]
fn test_page_style_drives_background_and_scripts() {
    let sheet = r#"
        /* --js-path: "commented.js"; */
        :root {
            --base-bg-color: #0b2e1f;
            --js-path: "var_binder.js";
            --js-path-2: './effects.js';
        }
    "#;
    let mut surface = MemorySurface::new();
    surface.attach_style("content-style-settings", sheet);

    assert_eq!(surface.computed_property(BASE_BG_COLOR).as_deref(), Some("#0b2e1f"));
    assert_eq!(css::script_paths(sheet), vec!["var_binder.js", "./effects.js"]);
}
