use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn refpack_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("refpack");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    // Create config
    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let data_dir = root.join("data");
    fs::create_dir_all(&data_dir).unwrap();

    // Create test files
    let files_dir = root.join("files");
    fs::create_dir_all(files_dir.join("notes")).unwrap();
    fs::create_dir_all(files_dir.join("skip")).unwrap();
    fs::write(
        files_dir.join("alpha.md"),
        "# Alpha Document\n\nGuidance on compliance reporting.\n\nCovers quarterly filing requirements.",
    )
    .unwrap();
    fs::write(
        files_dir.join("beta.md"),
        "# Beta Document\n\nRetention policy overview.\n\nRecords must be kept for seven years.",
    )
    .unwrap();
    fs::write(
        files_dir.join("gamma.txt"),
        "Gamma plain text file.\n\nNotes about audit preparation and evidence collection.",
    )
    .unwrap();
    fs::write(files_dir.join("empty.md"), "   \n\n\t  \n").unwrap();
    fs::write(
        files_dir.join("notes").join("delta.md"),
        "# Delta\n\nSupplementary notes stored in a subdirectory.",
    )
    .unwrap();
    fs::write(
        files_dir.join("skip").join("omega.md"),
        "# Omega\n\nThis file sits under an excluded directory.",
    )
    .unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/refpack.sqlite"

[assembly]
default_max_tokens = 200000
min_partial_tokens = 1000
chars_per_token = 3.5

[loader]
include_globs = ["**/*.md", "**/*.txt"]
exclude_globs = ["**/skip/**"]
"#,
        root.display()
    );

    let config_path = config_dir.join("refpack.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_refpack(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = refpack_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run refpack binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn files_dir(tmp: &TempDir) -> PathBuf {
    tmp.path().join("files")
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_refpack(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data").join("refpack.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_refpack(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_refpack(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_load_directory_applies_globs_and_skips_empty() {
    let (tmp, config_path) = setup_test_env();
    let files = files_dir(&tmp);

    run_refpack(&config_path, &["init"]);
    let (stdout, stderr, success) = run_refpack(
        &config_path,
        &["load", files.to_str().unwrap(), "--scope", "global"],
    );
    assert!(success, "load failed: stdout={}, stderr={}", stdout, stderr);
    // skip/omega.md is excluded by glob; empty.md is found but skipped
    assert!(stdout.contains("files found: 5"), "got: {}", stdout);
    assert!(stdout.contains("added: 4"), "got: {}", stdout);
    assert!(stdout.contains("skipped: 1"), "got: {}", stdout);
    assert!(stdout.contains("ok"));
    // The skip is warned per file, naming the path
    assert!(stderr.contains("empty.md"), "got: {}", stderr);
}

#[test]
fn test_load_directory_idempotent() {
    let (tmp, config_path) = setup_test_env();
    let files = files_dir(&tmp);

    run_refpack(&config_path, &["init"]);
    run_refpack(
        &config_path,
        &["load", files.to_str().unwrap(), "--scope", "global"],
    );
    let (stdout, _, success) = run_refpack(
        &config_path,
        &["load", files.to_str().unwrap(), "--scope", "global"],
    );
    assert!(success);
    assert!(stdout.contains("added: 0"), "got: {}", stdout);
    assert!(stdout.contains("updated: 4"), "got: {}", stdout);

    let (list_out, _, _) = run_refpack(&config_path, &["docs", "list"]);
    assert!(list_out.contains("4 document(s)"), "got: {}", list_out);
}

#[test]
fn test_load_single_file_with_title() {
    let (tmp, config_path) = setup_test_env();
    let alpha = files_dir(&tmp).join("alpha.md");

    run_refpack(&config_path, &["init"]);
    let (stdout, _, success) = run_refpack(
        &config_path,
        &[
            "load",
            alpha.to_str().unwrap(),
            "--scope",
            "system",
            "--title",
            "Alpha Guide",
        ],
    );
    assert!(success);
    assert!(stdout.contains("added: Alpha Guide"), "got: {}", stdout);

    let (list_out, _, _) = run_refpack(&config_path, &["docs", "list"]);
    assert!(list_out.contains("Alpha Guide"));
    assert!(list_out.contains("system"));
}

#[test]
fn test_load_entity_scope_requires_entity() {
    let (tmp, config_path) = setup_test_env();
    let alpha = files_dir(&tmp).join("alpha.md");

    run_refpack(&config_path, &["init"]);
    let (_, stderr, success) = run_refpack(
        &config_path,
        &["load", alpha.to_str().unwrap(), "--scope", "entity"],
    );
    assert!(!success, "entity scope without --entity should fail");
    assert!(stderr.contains("requires --entity"), "got: {}", stderr);
}

#[test]
fn test_load_unknown_scope_errors() {
    let (tmp, config_path) = setup_test_env();
    let alpha = files_dir(&tmp).join("alpha.md");

    run_refpack(&config_path, &["init"]);
    let (_, stderr, success) = run_refpack(
        &config_path,
        &["load", alpha.to_str().unwrap(), "--scope", "team"],
    );
    assert!(!success);
    assert!(stderr.contains("Unknown scope"), "got: {}", stderr);
}

#[test]
fn test_load_missing_path_errors() {
    let (_tmp, config_path) = setup_test_env();

    run_refpack(&config_path, &["init"]);
    let (_, stderr, success) = run_refpack(&config_path, &["load", "/no/such/file.md"]);
    assert!(!success);
    assert!(stderr.contains("does not exist"), "got: {}", stderr);
}

#[test]
fn test_docs_list_empty() {
    let (_tmp, config_path) = setup_test_env();

    run_refpack(&config_path, &["init"]);
    let (stdout, _, success) = run_refpack(&config_path, &["docs", "list"]);
    assert!(success);
    assert!(stdout.contains("No documents loaded."));
}

#[test]
fn test_docs_rm_removes_document() {
    let (tmp, config_path) = setup_test_env();
    let alpha = files_dir(&tmp).join("alpha.md");

    run_refpack(&config_path, &["init"]);
    run_refpack(&config_path, &["load", alpha.to_str().unwrap()]);

    let (list_out, _, _) = run_refpack(&config_path, &["docs", "list"]);
    let id = list_out
        .lines()
        .find(|l| l.contains("alpha.md"))
        .and_then(|l| l.split_whitespace().next())
        .map(str::to_string)
        .expect("alpha.md should be listed");

    let (stdout, _, success) = run_refpack(&config_path, &["docs", "rm", &id]);
    assert!(success, "rm failed: {}", stdout);
    assert!(stdout.contains("removed"));

    let (list_out, _, _) = run_refpack(&config_path, &["docs", "list"]);
    assert!(!list_out.contains("alpha.md"));
}

#[test]
fn test_docs_rm_missing_document() {
    let (_tmp, config_path) = setup_test_env();

    run_refpack(&config_path, &["init"]);
    let (_, stderr, success) = run_refpack(&config_path, &["docs", "rm", "nonexistent-id"]);
    assert!(!success, "rm with missing id should fail");
    assert!(stderr.contains("not found"), "got: {}", stderr);
}

#[test]
fn test_settings_set_and_list() {
    let (_tmp, config_path) = setup_test_env();

    run_refpack(&config_path, &["init"]);
    let (stdout, _, success) = run_refpack(
        &config_path,
        &[
            "settings", "set", "draft_reply", "--use-kb", "false", "--tokens", "5000",
        ],
    );
    assert!(success);
    assert!(stdout.contains("set draft_reply_use_kb = false"), "got: {}", stdout);
    assert!(stdout.contains("set draft_reply_tokens = 5000"), "got: {}", stdout);

    let (list_out, _, _) = run_refpack(&config_path, &["settings", "list"]);
    assert!(list_out.contains("draft_reply_use_kb"));
    assert!(list_out.contains("false"));
    assert!(list_out.contains("draft_reply_tokens"));
    assert!(list_out.contains("5000"));
}

#[test]
fn test_settings_set_requires_a_flag() {
    let (_tmp, config_path) = setup_test_env();

    run_refpack(&config_path, &["init"]);
    let (_, stderr, success) = run_refpack(&config_path, &["settings", "set", "draft_reply"]);
    assert!(!success);
    assert!(stderr.contains("nothing to set"), "got: {}", stderr);
}

#[test]
fn test_settings_tokens_must_be_positive() {
    let (_tmp, config_path) = setup_test_env();

    run_refpack(&config_path, &["init"]);
    let (_, stderr, success) = run_refpack(
        &config_path,
        &["settings", "set", "draft_reply", "--tokens", "0"],
    );
    assert!(!success);
    assert!(stderr.contains("--tokens must be > 0"), "got: {}", stderr);
}

#[test]
fn test_assemble_empty_knowledge_base() {
    let (_tmp, config_path) = setup_test_env();

    run_refpack(&config_path, &["init"]);
    let (stdout, stderr, success) = run_refpack(&config_path, &["assemble", "qa"]);
    assert!(success, "assemble must not fail on an empty knowledge base");
    assert!(stdout.is_empty(), "no context expected, got: {}", stdout);
    assert!(stderr.contains("assembled 0 document(s)"), "got: {}", stderr);
}

#[test]
fn test_assemble_orders_tiers() {
    let (tmp, config_path) = setup_test_env();
    let files = files_dir(&tmp);

    run_refpack(&config_path, &["init"]);
    // global gets the higher numeric priority; tier order must still win
    run_refpack(
        &config_path,
        &[
            "load",
            files.join("beta.md").to_str().unwrap(),
            "--scope",
            "global",
            "--priority",
            "99",
        ],
    );
    run_refpack(
        &config_path,
        &["load", files.join("alpha.md").to_str().unwrap(), "--scope", "system"],
    );

    let (stdout, _, success) = run_refpack(&config_path, &["assemble", "qa"]);
    assert!(success);
    let sys_pos = stdout.find("=== alpha.md ===").expect("system doc missing");
    let glob_pos = stdout.find("=== beta.md ===").expect("global doc missing");
    assert!(
        sys_pos < glob_pos,
        "system tier must precede global tier: {}",
        stdout
    );
}

#[test]
fn test_assemble_priority_orders_within_tier() {
    let (tmp, config_path) = setup_test_env();
    let files = files_dir(&tmp);

    run_refpack(&config_path, &["init"]);
    run_refpack(
        &config_path,
        &[
            "load",
            files.join("alpha.md").to_str().unwrap(),
            "--scope",
            "global",
            "--priority",
            "1",
        ],
    );
    run_refpack(
        &config_path,
        &[
            "load",
            files.join("beta.md").to_str().unwrap(),
            "--scope",
            "global",
            "--priority",
            "9",
        ],
    );

    let (stdout, _, _) = run_refpack(&config_path, &["assemble", "qa"]);
    let high = stdout.find("=== beta.md ===").expect("high-priority doc missing");
    let low = stdout.find("=== alpha.md ===").expect("low-priority doc missing");
    assert!(high < low, "higher priority should come first: {}", stdout);
}

#[test]
fn test_assemble_disabled_function_returns_empty() {
    let (tmp, config_path) = setup_test_env();
    let alpha = files_dir(&tmp).join("alpha.md");

    run_refpack(&config_path, &["init"]);
    run_refpack(&config_path, &["load", alpha.to_str().unwrap()]);
    run_refpack(
        &config_path,
        &["settings", "set", "qa", "--use-kb", "false"],
    );

    let (stdout, stderr, success) = run_refpack(&config_path, &["assemble", "qa"]);
    assert!(success);
    assert!(stdout.is_empty(), "disabled function must yield no context");
    assert!(stderr.contains("assembled 0 document(s)"), "got: {}", stderr);

    // other functions are unaffected
    let (stdout, _, _) = run_refpack(&config_path, &["assemble", "other_fn"]);
    assert!(stdout.contains("=== alpha.md ==="));
}

#[test]
fn test_assemble_truncates_oversized_document() {
    let (tmp, config_path) = setup_test_env();
    let big = tmp.path().join("big.md");
    fs::write(&big, "x".repeat(70_000)).unwrap();

    run_refpack(&config_path, &["init"]);
    run_refpack(&config_path, &["load", big.to_str().unwrap()]);

    let (stdout, _, success) = run_refpack(
        &config_path,
        &["assemble", "qa", "--max-tokens", "1000"],
    );
    assert!(success);
    assert!(
        stdout.contains("[Document Loading Info: Some documents are shown partially due to size: big.md (truncated to fit limit)]"),
        "missing truncation banner: {}",
        stdout
    );
    assert!(stdout.contains("Full document: big.md"), "got: {}", stdout);

    let (json_out, _, _) = run_refpack(
        &config_path,
        &["assemble", "qa", "--max-tokens", "1000", "--json"],
    );
    let parsed: serde_json::Value = serde_json::from_str(&json_out).unwrap();
    assert_eq!(parsed["token_count"], 1000);
    assert_eq!(parsed["docs_loaded"], 1);
}

#[test]
fn test_assemble_json_empty_shape() {
    let (_tmp, config_path) = setup_test_env();

    run_refpack(&config_path, &["init"]);
    let (stdout, _, success) = run_refpack(&config_path, &["assemble", "qa", "--json"]);
    assert!(success);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["context"], "");
    assert_eq!(parsed["token_count"], 0);
    assert_eq!(parsed["docs_loaded"], 0);
}

#[test]
fn test_assemble_entity_documents_need_qualifier() {
    let (tmp, config_path) = setup_test_env();
    let alpha = files_dir(&tmp).join("alpha.md");

    run_refpack(&config_path, &["init"]);
    run_refpack(
        &config_path,
        &[
            "load",
            alpha.to_str().unwrap(),
            "--scope",
            "entity",
            "--entity",
            "Acme Corp",
        ],
    );

    // without a qualifier the entity tier is not fetched
    let (stdout, _, _) = run_refpack(&config_path, &["assemble", "qa"]);
    assert!(!stdout.contains("=== alpha.md ==="), "got: {}", stdout);

    // qualifier matches case-insensitively
    let (stdout, _, _) = run_refpack(
        &config_path,
        &["assemble", "qa", "--entity", "acme corp"],
    );
    assert!(stdout.contains("=== alpha.md ==="), "got: {}", stdout);
}

#[test]
fn test_assemble_quiet_suppresses_blob() {
    let (tmp, config_path) = setup_test_env();
    let alpha = files_dir(&tmp).join("alpha.md");

    run_refpack(&config_path, &["init"]);
    run_refpack(&config_path, &["load", alpha.to_str().unwrap()]);

    let (stdout, stderr, success) = run_refpack(&config_path, &["assemble", "qa", "--quiet"]);
    assert!(success);
    assert!(stdout.is_empty(), "quiet mode should print no blob");
    assert!(stderr.contains("assembled 1 document(s)"), "got: {}", stderr);
}

#[test]
fn test_prompt_sections_in_order() {
    let (tmp, config_path) = setup_test_env();
    let alpha = files_dir(&tmp).join("alpha.md");

    run_refpack(&config_path, &["init"]);
    run_refpack(&config_path, &["load", alpha.to_str().unwrap()]);

    let (stdout, _, success) = run_refpack(
        &config_path,
        &[
            "prompt",
            "qa",
            "--input",
            "What are the filing requirements?",
            "--system",
            "Answer briefly.",
        ],
    );
    assert!(success);
    let sys = stdout.find("=== SYSTEM INSTRUCTIONS ===").expect("system section");
    let refs = stdout.find("=== REFERENCE MATERIALS ===").expect("reference section");
    let user = stdout.find("=== USER INPUT ===").expect("user section");
    assert!(sys < refs && refs < user, "sections out of order: {}", stdout);
    assert!(stdout.contains("What are the filing requirements?"));
}

#[test]
fn test_prompt_without_documents_omits_reference_section() {
    let (_tmp, config_path) = setup_test_env();

    run_refpack(&config_path, &["init"]);
    let (stdout, _, success) = run_refpack(&config_path, &["prompt", "qa", "--input", "hello"]);
    assert!(success);
    assert!(stdout.contains("=== USER INPUT ===\nhello"));
    assert!(!stdout.contains("=== REFERENCE MATERIALS ==="));
    assert!(!stdout.contains("=== SYSTEM INSTRUCTIONS ==="));
}

#[test]
fn test_stats_overview() {
    let (tmp, config_path) = setup_test_env();
    let files = files_dir(&tmp);

    run_refpack(&config_path, &["init"]);
    run_refpack(
        &config_path,
        &["load", files.join("alpha.md").to_str().unwrap(), "--scope", "system"],
    );
    run_refpack(
        &config_path,
        &["load", files.join("beta.md").to_str().unwrap(), "--scope", "global"],
    );
    run_refpack(&config_path, &["settings", "set", "qa", "--tokens", "9000"]);

    let (stdout, _, success) = run_refpack(&config_path, &["stats"]);
    assert!(success);
    assert!(stdout.contains("Knowledge Base Stats"));
    assert!(stdout.contains("Documents:   2"), "got: {}", stdout);
    assert!(stdout.contains("Settings:    1"), "got: {}", stdout);
    assert!(stdout.contains("By scope:"));
    assert!(stdout.contains("system"));
    assert!(stdout.contains("global"));
}

#[test]
fn test_invalid_config_rejected() {
    let (tmp, config_path) = setup_test_env();

    let bad = format!(
        r#"[db]
path = "{}/data/refpack.sqlite"

[assembly]
default_max_tokens = 0
"#,
        tmp.path().display()
    );
    fs::write(&config_path, bad).unwrap();

    let (_, stderr, success) = run_refpack(&config_path, &["init"]);
    assert!(!success, "config with zero budget should be rejected");
    assert!(
        stderr.contains("assembly.default_max_tokens must be > 0"),
        "got: {}",
        stderr
    );
}
