use std::sync::Arc;

use gradgen::driver::{generate, generate_to_dir, generated_comment, load_specs, write_output};
use gradgen::error::GenResult;
use gradgen::ir::GeneratedFunction;
use gradgen::schema::{parse_specs, schema_fingerprint};
use gradgen::target::{
    get_target, list_targets, register_target, FileHeader, FragmentCollections, OutputFile,
    RenderTarget, RenderedFunction, TargetInfo,
};
use gradgen::{GenConfig, GenError, SpecErrorCode};

/// Lists what each function would contain, one line per fragment.
struct OutlineTarget;

impl RenderTarget for OutlineTarget {
    fn name(&self) -> &str {
        "outline"
    }

    fn render_function(&self, function: &GeneratedFunction) -> GenResult<RenderedFunction> {
        Ok(RenderedFunction {
            declaration: format!("decl {} {:?}", function.op, function.base),
            definition: format!("def {} body={}", function.op, function.body.len()),
            registration: format!("reg {}", function.op),
        })
    }

    fn render_files(
        &self,
        fragments: &FragmentCollections,
        header: &FileHeader,
    ) -> GenResult<Vec<OutputFile>> {
        let mut contents = format!("// {}\n", header.generated_comment);
        for section in [
            &fragments.declarations,
            &fragments.definitions,
            &fragments.registrations,
        ] {
            contents.push_str(&section.join("\n"));
            contents.push('\n');
        }
        Ok(vec![OutputFile {
            name: "outline.txt".to_string(),
            contents,
        }])
    }
}

const SCHEMA: &str = r#"
[
  {
    "name": "add",
    "op": "AddBackward",
    "args_with_gradients": [
      {"name": "self", "type": "Tensor"},
      {"name": "other", "type": "Tensor"}
    ],
    "derivatives": [
      {"var_names": ["self"], "formula": "grad"},
      {"var_names": ["other"], "formula": "grad"}
    ]
  },
  {
    "name": "expand",
    "op": "ExpandBackward",
    "args_with_gradients": [{"name": "self", "type": "Tensor"}],
    "saved_inputs": [{"name": "self_sizes", "type": "IntList"}],
    "derivatives": [{"var_names": ["self"], "formula": "grad.sum_to_size(self_sizes)"}]
  }
]
"#;

fn setup_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn schema_json_round_trips_into_specs() {
    let specs = parse_specs(SCHEMA).expect("schema parses");
    assert_eq!(specs.len(), 2);
    assert_eq!(specs[0].type_name(), "AddBackward");
    assert_eq!(specs[1].saved_inputs[0].type_tag, "IntList");
    assert!(specs[0].saved_outputs.is_empty());
}

#[test]
fn generate_renders_every_function_in_order() {
    setup_logger();
    let specs = parse_specs(SCHEMA).expect("schema parses");
    let config = GenConfig::default().with_source_label("test.json");
    let output = generate(&specs, &config, &OutlineTarget).expect("generate succeeds");

    assert_eq!(output.functions.len(), 2);
    assert_eq!(
        output.fragments.declarations,
        vec!["decl AddBackward Traceable", "decl ExpandBackward Opaque"]
    );
    assert_eq!(output.fingerprint, schema_fingerprint(&specs).expect("fingerprint"));

    let file = output.file("outline.txt").expect("outline file");
    let comment = generated_comment(&config, &OutlineTarget, output.fingerprint);
    assert!(file.contents.starts_with(&format!("// {comment}")));
    assert!(comment.contains("test.json"));
    assert!(comment.contains("by gradgen outline/v0 "));
    assert!(file.contents.contains("reg ExpandBackward"));
}

#[test]
fn write_output_creates_files() {
    let specs = parse_specs(SCHEMA).expect("schema parses");
    let output = generate(&specs, &GenConfig::default(), &OutlineTarget).expect("generate");
    let dir = tempfile::tempdir().expect("tempdir");
    let out_dir = dir.path().join("nested").join("out");

    write_output(&output, &out_dir).expect("write succeeds");
    let written = std::fs::read_to_string(out_dir.join("outline.txt")).expect("file written");
    assert_eq!(written, output.files[0].contents);
}

#[test]
fn generate_to_dir_uses_registered_target() {
    register_target(Arc::new(OutlineTarget)).expect("register");
    let outline = TargetInfo {
        name: "outline".to_string(),
        version: 0,
    };
    assert!(list_targets().contains(&outline));
    assert!(get_target("outline").is_some());

    let dir = tempfile::tempdir().expect("tempdir");
    let schema_path = dir.path().join("schema.json");
    std::fs::write(&schema_path, SCHEMA).expect("write schema");
    let out_dir = dir.path().join("out");

    let output = generate_to_dir(&schema_path, &out_dir, &GenConfig::default(), "outline")
        .expect("generation succeeds");
    assert_eq!(output.functions.len(), 2);
    assert!(out_dir.join("outline.txt").exists());
}

#[test]
fn unknown_target_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = generate_to_dir(
        dir.path().join("missing.json"),
        dir.path().join("out"),
        &GenConfig::default(),
        "no-such-target",
    )
    .expect_err("unknown target");
    assert!(matches!(
        err.downcast_ref::<GenError>(),
        Some(GenError::UnknownTarget(name)) if name == "no-such-target"
    ));
}

#[test]
fn failed_run_writes_nothing() {
    register_target(Arc::new(OutlineTarget)).expect("register");
    let dir = tempfile::tempdir().expect("tempdir");
    let schema_path = dir.path().join("schema.json");
    let bad = SCHEMA.replace("\"var_names\": [\"other\"]", "\"var_names\": [\"alpha\"]");
    std::fs::write(&schema_path, bad).expect("write schema");
    let out_dir = dir.path().join("out");

    let err = generate_to_dir(&schema_path, &out_dir, &GenConfig::default(), "outline")
        .expect_err("violation aborts");
    let gen_err = err.downcast_ref::<GenError>().expect("generator error");
    assert_eq!(gen_err.spec_code(), Some(SpecErrorCode::UndeclaredGradientSlot));
    assert!(!out_dir.exists());
}

#[test]
fn load_specs_reports_path_on_failure() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "[{\"name\": 3}]").expect("write schema");
    let err = load_specs(&path).expect_err("invalid schema");
    assert!(format!("{err:#}").contains("broken.json"));
}

#[test]
fn config_loads_from_json_with_defaults() {
    let config = GenConfig::from_json_str(r#"{"namespace": "my::ns", "untraceable": ["add"]}"#)
        .expect("config parses");
    assert_eq!(config.namespace, "my::ns");
    assert!(config.untraceable.contains("add"));
    assert!(!config.untraceable.contains("expand"));
    assert_eq!(config.source_label, GenConfig::default().source_label);

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{}").expect("write config");
    let config = GenConfig::from_json_file(&path).expect("config file");
    assert_eq!(config, GenConfig::default());
}

/// Same output shape as `OutlineTarget` under a different name and version.
struct VersionedTarget {
    name: &'static str,
    version: u64,
}

impl RenderTarget for VersionedTarget {
    fn name(&self) -> &str {
        self.name
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn render_function(&self, function: &GeneratedFunction) -> GenResult<RenderedFunction> {
        OutlineTarget.render_function(function)
    }

    fn render_files(
        &self,
        fragments: &FragmentCollections,
        header: &FileHeader,
    ) -> GenResult<Vec<OutputFile>> {
        OutlineTarget.render_files(fragments, header)
    }
}

#[test]
fn reregistering_same_version_replaces_target() {
    let first = Arc::new(VersionedTarget {
        name: "versioned-same",
        version: 3,
    });
    let replaced = register_target(first).expect("first registration");
    assert!(replaced.is_none());

    let second = Arc::new(VersionedTarget {
        name: "versioned-same",
        version: 3,
    });
    let replaced = register_target(second).expect("same version");
    assert_eq!(replaced.map(|target| target.version()), Some(3));
}

#[test]
fn conflicting_version_is_rejected_and_keeps_original() {
    register_target(Arc::new(VersionedTarget {
        name: "versioned-conflict",
        version: 1,
    }))
    .expect("first registration");

    let err = register_target(Arc::new(VersionedTarget {
        name: "versioned-conflict",
        version: 2,
    }))
    .err()
    .expect("version conflict");
    assert!(matches!(
        err,
        GenError::TargetConflict { ref name, registered: 1, offered: 2 }
            if name == "versioned-conflict"
    ));

    let kept = get_target("versioned-conflict").expect("still registered");
    assert_eq!(kept.version(), 1);
}

#[test]
fn listed_targets_are_sorted_by_name() {
    for name in ["sorted-b", "sorted-a"] {
        register_target(Arc::new(VersionedTarget { name, version: 0 })).expect("register");
    }
    let names: Vec<String> = list_targets().into_iter().map(|info| info.name).collect();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
}
