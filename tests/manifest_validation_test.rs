use research_flow::manifest::{Comparator, Manifest};

const SAMPLE_MANIFEST: &str = "\
# Core dependencies
streamlit>=1.30.0
langchain>=0.1.0
langchain-openai==0.0.5
langgraph>=0.0.11
httpx==0.23.3

# PDF and Vector DB dependencies
pypdf>=4.0.0
chromadb>=0.4.22

# Ollama support
ollama
";

#[test]
fn test_exact_pin_extraction() {
    let manifest = Manifest::parse("httpx==0.23.3").unwrap();
    let entry = &manifest.entries[0];
    assert_eq!(entry.name, "httpx");
    assert_eq!(entry.constraints.len(), 1);
    assert_eq!(entry.constraints[0].op, Comparator::Eq);
    assert_eq!(entry.constraints[0].version.as_str(), "0.23.3");
}

#[test]
fn test_hyphenated_pin_extraction() {
    let manifest = Manifest::parse("langchain-openai==0.0.5").unwrap();
    let entry = &manifest.entries[0];
    assert_eq!(entry.name, "langchain-openai");
    assert_eq!(entry.constraints[0].op, Comparator::Eq);
    assert_eq!(entry.constraints[0].version.as_str(), "0.0.5");
}

#[test]
fn test_lower_bound_extraction() {
    let manifest = Manifest::parse("langgraph>=0.0.11").unwrap();
    let entry = &manifest.entries[0];
    assert_eq!(entry.name, "langgraph");
    assert_eq!(entry.constraints[0].op, Comparator::Ge);
    assert_eq!(entry.constraints[0].version.as_str(), "0.0.11");
}

#[test]
fn test_every_sample_line_parses() {
    let (manifest, issues) = Manifest::scan(SAMPLE_MANIFEST);
    assert!(issues.is_empty());
    assert_eq!(manifest.entries.len(), 8);
    assert_eq!(
        manifest.sections(),
        vec![
            "Core dependencies",
            "PDF and Vector DB dependencies",
            "Ollama support"
        ]
    );
    assert!(manifest.get("ollama").unwrap().constraints.is_empty());
    assert!(manifest.conflicts().is_empty());
}

#[test]
fn test_incompatible_duplicate_is_flagged() {
    let text = format!("{}\nhttpx>=0.24.0\n", SAMPLE_MANIFEST);
    let manifest = Manifest::parse(&text).unwrap();
    let conflicts = manifest.conflicts();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].name, "httpx");
    assert!(conflicts[0].reason.contains("0.23.3"));
}

#[test]
fn test_compatible_duplicate_is_not_flagged() {
    let text = format!("{}\nhttpx>=0.23.0,<0.24.0\n", SAMPLE_MANIFEST);
    let manifest = Manifest::parse(&text).unwrap();
    assert!(manifest.conflicts().is_empty());
}

#[test]
fn test_malformed_line_is_reported_with_its_number() {
    let text = "httpx==0.23.3\nthis is not == a valid specifier\n";
    let (manifest, issues) = Manifest::scan(text);
    assert_eq!(manifest.entries.len(), 1);
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].0, 2);
}
