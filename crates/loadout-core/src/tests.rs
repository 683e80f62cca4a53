use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tempfile::TempDir;

use crate::{
    Category, CategoryPaths, ComponentCounts, FileTotals, HomePathValidator, InstallManifest,
    InstalledFiles, ManifestError, PathValidator, ResolvedContent, VariantMetadata,
};

fn sample_manifest(target: &Path) -> InstallManifest {
    InstallManifest {
        tool: "acme-cli".to_string(),
        variant: "standard".to_string(),
        version: "0.3.0".to_string(),
        installed_at: Utc::now(),
        variant_info: VariantMetadata {
            name: "standard".to_string(),
            description: "balanced content set".to_string(),
            use_case: "daily development".to_string(),
            target_users: "individual developers".to_string(),
        },
        components: ComponentCounts {
            agents: 2,
            skills: 1,
            resources: 0,
            hooks: 0,
        },
        installed_files: InstalledFiles {
            agents: vec!["master".to_string(), "reviewer".to_string()],
            skills: vec!["refactoring".to_string()],
            resources: Vec::new(),
            hooks: Vec::new(),
        },
        paths: CategoryPaths::for_target(target),
        files: FileTotals {
            total: 5,
            formatted_size: "1.2 KB".to_string(),
        },
    }
}

#[test]
fn category_naming_rules() {
    assert_eq!(Category::Agents.installed_file_name("master"), "master.md");
    assert_eq!(Category::Skills.installed_file_name("refactoring"), "refactoring");
    assert_eq!(Category::Hooks.installed_file_name("pre-commit.sh"), "pre-commit.sh");
    assert!(Category::Skills.is_directory_item());
    assert!(!Category::Agents.is_directory_item());
}

#[test]
fn category_item_name_strips_agent_extension_only() {
    assert_eq!(
        Category::Agents.item_name(Path::new("/pkg/agents/master.md")),
        Some("master".to_string())
    );
    assert_eq!(
        Category::Resources.item_name(Path::new("/pkg/resources/style.css")),
        Some("style.css".to_string())
    );
    assert_eq!(
        Category::Skills.item_name(Path::new("/pkg/skills/refactoring")),
        Some("refactoring".to_string())
    );
}

#[test]
fn manifest_round_trip() {
    let dir = TempDir::new().expect("must create temp dir");
    let manifest = sample_manifest(dir.path());

    manifest.write(dir.path()).expect("must write manifest");
    let loaded = InstallManifest::load(dir.path()).expect("must load manifest");
    assert_eq!(loaded, manifest);
}

#[test]
fn manifest_json_uses_camel_case_keys() {
    let dir = TempDir::new().expect("must create temp dir");
    sample_manifest(dir.path()).write(dir.path()).expect("must write manifest");

    let raw = fs::read_to_string(InstallManifest::path_for(dir.path())).expect("must read");
    assert!(raw.contains("\"installedAt\""));
    assert!(raw.contains("\"installedFiles\""));
    assert!(raw.contains("\"variantInfo\""));
    assert!(raw.contains("\"formattedSize\""));
}

#[test]
fn manifest_load_distinguishes_missing_from_corrupt() {
    let dir = TempDir::new().expect("must create temp dir");

    let err = InstallManifest::load(dir.path()).expect_err("must report missing");
    assert!(matches!(err, ManifestError::Missing(_)));

    fs::write(InstallManifest::path_for(dir.path()), b"{not json").expect("must write junk");
    let err = InstallManifest::load(dir.path()).expect_err("must report corrupt");
    assert!(matches!(err, ManifestError::Corrupt { .. }));
}

#[test]
fn expected_item_path_applies_naming_rule() {
    let dir = TempDir::new().expect("must create temp dir");
    let manifest = sample_manifest(dir.path());

    assert_eq!(
        manifest.expected_item_path(Category::Agents, "master"),
        dir.path().join("agents").join("master.md")
    );
    assert_eq!(
        manifest.expected_item_path(Category::Skills, "refactoring"),
        dir.path().join("skills").join("refactoring")
    );
}

#[test]
fn resolved_content_counts_and_names() {
    let content = ResolvedContent {
        agents: vec![
            PathBuf::from("/pkg/agents/master.md"),
            PathBuf::from("/pkg/agents/reviewer.md"),
        ],
        skills: vec![PathBuf::from("/pkg/skills/refactoring")],
        resources: Vec::new(),
        hooks: vec![PathBuf::from("/pkg/hooks/pre-commit.sh")],
        total_files: 4,
    };

    let counts = content.component_counts();
    assert_eq!(counts.agents, 2);
    assert_eq!(counts.skills, 1);
    assert_eq!(counts.hooks, 1);
    assert_eq!(
        content.item_names(Category::Agents),
        vec!["master".to_string(), "reviewer".to_string()]
    );
    assert_eq!(
        content.item_names(Category::Hooks),
        vec!["pre-commit.sh".to_string()]
    );
}

#[test]
fn home_path_validator_expands_tilde() {
    let validator = HomePathValidator::new("/home/dev");
    assert_eq!(
        validator.expand("~/targets/acme").expect("must expand"),
        PathBuf::from("/home/dev/targets/acme")
    );
    assert_eq!(validator.expand("~").expect("must expand"), PathBuf::from("/home/dev"));
    assert_eq!(
        validator.expand("/opt/acme").expect("must expand"),
        PathBuf::from("/opt/acme")
    );
}

#[test]
fn check_existing_surfaces_manifest() {
    let dir = TempDir::new().expect("must create temp dir");
    let validator = HomePathValidator::new(dir.path());

    let probe = validator.check_existing(&dir.path().join("missing"));
    assert!(!probe.exists);
    assert!(probe.manifest.is_none());

    sample_manifest(dir.path()).write(dir.path()).expect("must write manifest");
    let probe = validator.check_existing(dir.path());
    assert!(probe.exists);
    assert_eq!(
        probe.manifest.expect("manifest should load").variant,
        "standard"
    );
}
