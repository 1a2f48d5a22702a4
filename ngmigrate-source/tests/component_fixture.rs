use ngmigrate_source::{SourceFile, TemplateSource};
use ngmigrate_types::TemplateLocation;
use pretty_assertions::assert_eq;

const APP: &str = include_str!("fixtures/app.component.ts");

fn app() -> SourceFile {
    SourceFile::parse("my-angular-app/my-file.ts", APP).expect("fixture parses")
}

#[test]
fn external_template_resolves_next_to_component() {
    let components = app().components();
    assert_eq!(components.len(), 1);
    assert_eq!(components[0].class_name, "AppComponent");

    let Some(TemplateSource::External { url, path }) = &components[0].template else {
        panic!("expected templateUrl");
    };
    assert_eq!(url, "./my-file.html");
    assert_eq!(
        components[0].template.as_ref().map(TemplateSource::location),
        Some(TemplateLocation::External { path: path.clone() })
    );
    assert_eq!(path.as_str(), "my-angular-app/my-file.html");
}

#[test]
fn hook_injects_after_last_multiline_parameter() {
    let out = app().migrate_params_hook().expect("hook migrates");
    let text = out.text();

    assert!(text.starts_with(
        "import { ActivatedRoute } from '@angular/router';\nimport { Component, ViewChild"
    ));
    assert!(text.contains(
        "              private dialog: DialogService, private activatedRoute: ActivatedRoute\n  ) {"
    ));
    assert_eq!(text.matches("ActivatedRoute").count(), 2);
}

#[test]
fn untouched_regions_are_byte_identical() {
    let out = app().migrate_params_hook().expect("hook migrates");
    let text = out.text();
    let tail = &APP[APP.find("  ) {").expect("fixture shape")..];
    assert!(text.ends_with(tail));
    let prefix = &APP[..APP.find("private dialog: DialogService").expect("fixture shape")];
    let import = "import { ActivatedRoute } from '@angular/router';\n";
    assert_eq!(&text[import.len()..import.len() + prefix.len()], prefix);
}

#[test]
fn hook_migration_is_idempotent() {
    let once = app().migrate_params_hook().expect("hook migrates");
    let twice = once.migrate_params_hook().expect("hook migrates");
    assert_eq!(twice.text(), once.text());
}
