//! Content loading and merging.
//!
//! A [`ContentLibrary`] gathers the four declarative document kinds. The
//! built-in set is compiled in; more documents can be merged from a
//! directory laid out as `moments/`, `dialogue/`, `emergence/` and `beats/`.
//!
//! Merge policy: duplicate beat ids and emergence rule names are errors,
//! duplicate moment ids keep the first copy, and dialogue appends.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use city_model::{
    ContentError, DialogueLibraryFile, EmergenceRule, EmergenceRuleCollection, MomentLibrary,
    StoryBeat, StoryBeatCollection,
};
use narrator::DialogueLibrary;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

const BUILTIN_MOMENTS: &[(&str, &str)] = &[(
    "builtin:moments/moments.json",
    include_str!("../content/moments/moments.json"),
)];

const BUILTIN_DIALOGUE: &[(&str, &str)] = &[
    ("builtin:dialogue/city.json", include_str!("../content/dialogue/city.json")),
    ("builtin:dialogue/parks.json", include_str!("../content/dialogue/parks.json")),
    ("builtin:dialogue/transit.json", include_str!("../content/dialogue/transit.json")),
    ("builtin:dialogue/water.json", include_str!("../content/dialogue/water.json")),
];

const BUILTIN_EMERGENCE: &[(&str, &str)] = &[(
    "builtin:emergence/emergence.json",
    include_str!("../content/emergence/emergence.json"),
)];

const BUILTIN_BEATS: &[(&str, &str)] = &[(
    "builtin:beats/beats.json",
    include_str!("../content/beats/beats.json"),
)];

/// Every piece of declarative content the engine runs on.
#[derive(Debug, Clone, Default)]
pub struct ContentLibrary {
    pub moments: MomentLibrary,
    pub dialogue: DialogueLibrary,
    pub rules: Vec<EmergenceRule>,
    pub beats: Vec<StoryBeat>,
}

impl ContentLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// The compiled-in content, validated.
    pub fn builtin() -> Result<Self, ContentError> {
        let mut library = Self::new();
        for (name, text) in BUILTIN_MOMENTS {
            library.add_moments(MomentLibrary::from_json(name, text)?);
        }
        for (name, text) in BUILTIN_DIALOGUE {
            library.add_dialogue(parse_document(name, text)?);
        }
        for (name, text) in BUILTIN_EMERGENCE {
            library.add_rules(name, parse_document(name, text)?)?;
        }
        for (name, text) in BUILTIN_BEATS {
            library.add_beats(name, parse_document(name, text)?)?;
        }
        library.validate()?;
        Ok(library)
    }

    /// Content from a directory only, validated.
    pub fn from_dir(dir: &Path) -> Result<Self, ContentError> {
        let mut library = Self::new();
        library.merge_dir(dir)?;
        library.validate()?;
        Ok(library)
    }

    /// Merges every `*.json` document under the directory's four content
    /// subdirectories. Missing subdirectories are skipped. Call
    /// [`ContentLibrary::validate`] afterwards.
    pub fn merge_dir(&mut self, dir: &Path) -> Result<(), ContentError> {
        for path in json_files(&dir.join("moments"))? {
            let (name, text) = read_document(&path)?;
            self.add_moments(MomentLibrary::from_json(&name, &text)?);
        }
        for path in json_files(&dir.join("dialogue"))? {
            let (name, text) = read_document(&path)?;
            self.add_dialogue(parse_document(&name, &text)?);
        }
        for path in json_files(&dir.join("emergence"))? {
            let (name, text) = read_document(&path)?;
            self.add_rules(&name, parse_document(&name, &text)?)?;
        }
        for path in json_files(&dir.join("beats"))? {
            let (name, text) = read_document(&path)?;
            self.add_beats(&name, parse_document(&name, &text)?)?;
        }

        info!(
            "Content from {}: {} moments, {} dialogue fragments, {} rules, {} beats",
            dir.display(),
            self.moments.moments.len(),
            self.dialogue.len(),
            self.rules.len(),
            self.beats.len()
        );
        Ok(())
    }

    /// Adds moments, keeping the first copy of any duplicate id.
    pub fn add_moments(&mut self, library: MomentLibrary) {
        let mut known: HashSet<String> = self
            .moments
            .moments
            .iter()
            .map(|m| m.moment_id.clone())
            .collect();
        for moment in library.moments {
            if !known.insert(moment.moment_id.clone()) {
                warn!("Duplicate moment {} ignored", moment.moment_id);
                continue;
            }
            self.moments.moments.push(moment);
        }
        if self.moments.version.is_none() {
            self.moments.version = library.version;
        }
        if self.moments.description.is_none() {
            self.moments.description = library.description;
        }
    }

    pub fn add_dialogue(&mut self, file: DialogueLibraryFile) {
        self.dialogue.merge(file);
    }

    /// Adds rules. A name already loaded is an error.
    pub fn add_rules(
        &mut self,
        document: &str,
        collection: EmergenceRuleCollection,
    ) -> Result<(), ContentError> {
        for rule in collection.emergent_properties {
            if self.rules.iter().any(|r| r.name == rule.name) {
                return Err(ContentError::invalid(
                    document,
                    format!("duplicate emergence rule {:?}", rule.name),
                ));
            }
            self.rules.push(rule);
        }
        Ok(())
    }

    /// Adds beats. An id already loaded is an error.
    pub fn add_beats(
        &mut self,
        document: &str,
        collection: StoryBeatCollection,
    ) -> Result<(), ContentError> {
        for beat in collection.beats {
            if self.beats.iter().any(|b| b.id == beat.id) {
                return Err(ContentError::invalid(
                    document,
                    format!("duplicate story beat {:?}", beat.id),
                ));
            }
            self.beats.push(beat);
        }
        Ok(())
    }

    /// Checks cross-document references and required fields.
    pub fn validate(&self) -> Result<(), ContentError> {
        for beat in &self.beats {
            if beat.id.trim().is_empty() {
                return Err(ContentError::invalid(
                    "beats",
                    format!("beat {:?} has an empty id", beat.name),
                ));
            }
        }

        for rule in &self.rules {
            if rule.name.trim().is_empty() {
                return Err(ContentError::invalid("emergence", "rule with an empty name"));
            }
            if rule.conditions.required_thread_types.is_empty() {
                return Err(ContentError::invalid(
                    "emergence",
                    format!("rule {:?} requires no thread types", rule.name),
                ));
            }
            if let Some(beat_id) = &rule.story_beat_id {
                if !self.beats.iter().any(|b| &b.id == beat_id) {
                    return Err(ContentError::invalid(
                        "emergence",
                        format!("rule {:?} names unknown story beat {:?}", rule.name, beat_id),
                    ));
                }
            }
        }
        Ok(())
    }
}

fn parse_document<T: DeserializeOwned>(document: &str, text: &str) -> Result<T, ContentError> {
    serde_json::from_str(text).map_err(|source| ContentError::Json {
        document: document.to_string(),
        source,
    })
}

fn read_document(path: &Path) -> Result<(String, String), ContentError> {
    let name = path.display().to_string();
    let text = fs::read_to_string(path).map_err(|source| ContentError::Io {
        path: name.clone(),
        source,
    })?;
    Ok((name, text))
}

/// `*.json` files directly inside `dir`, sorted by name.
fn json_files(dir: &Path) -> Result<Vec<PathBuf>, ContentError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let io_err = |source| ContentError::Io {
        path: dir.display().to_string(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use city_model::{BeatTrigger, DialogueContext, Speaker};
    use tempfile::tempdir;

    #[test]
    fn test_builtin_content_loads() {
        let library = ContentLibrary::builtin().unwrap();

        assert_eq!(library.moments.moments.len(), 8);
        assert_eq!(library.rules.len(), 5);
        assert!(library
            .beats
            .iter()
            .any(|b| b.trigger == BeatTrigger::ThreadCreated { count: 3 }));
        assert!(library
            .dialogue
            .fragments_for(Speaker::City, DialogueContext::Greeting)
            .next()
            .is_some());
    }

    #[test]
    fn test_duplicate_moment_keeps_first() {
        let first = r#"{"moments": [{"momentID": "m1", "text": "first", "type": "natural",
            "district": 1, "fragility": 1, "associatedAct": 1, "firstMention": "",
            "ifPreserved": "", "ifDestroyed": "", "ifRemembered": ""}]}"#;
        let second = first.replace("\"first\"", "\"second\"");

        let mut library = ContentLibrary::new();
        library.add_moments(MomentLibrary::from_json("a", first).unwrap());
        library.add_moments(MomentLibrary::from_json("b", &second).unwrap());

        assert_eq!(library.moments.moments.len(), 1);
        assert_eq!(library.moments.moments[0].text, "first");
    }

    #[test]
    fn test_duplicate_beat_is_error() {
        let beats: StoryBeatCollection = parse_document(
            "beats",
            r#"{"beats": [{"id": "b1", "name": "B", "trigger": {"type": "threadCreated", "count": 1}}]}"#,
        )
        .unwrap();

        let mut library = ContentLibrary::new();
        library.add_beats("one.json", beats.clone()).unwrap();
        let err = library.add_beats("two.json", beats).unwrap_err();
        assert!(err.to_string().contains("two.json"));
    }

    #[test]
    fn test_duplicate_rule_is_error() {
        let rules: EmergenceRuleCollection = parse_document(
            "rules",
            r#"{"emergentProperties": [{"name": "Flow",
                "conditions": {"requiredThreadTypes": ["water"]},
                "consciousnessExpansion": {"expandedSelfAwareness": "x"}}]}"#,
        )
        .unwrap();

        let mut library = ContentLibrary::new();
        library.add_rules("one.json", rules.clone()).unwrap();
        assert!(library.add_rules("two.json", rules).is_err());
    }

    #[test]
    fn test_unknown_beat_reference_is_invalid() {
        let rules: EmergenceRuleCollection = parse_document(
            "rules",
            r#"{"emergentProperties": [{"name": "Flow",
                "conditions": {"requiredThreadTypes": ["water"]},
                "consciousnessExpansion": {"expandedSelfAwareness": "x"},
                "storyBeatID": "nowhere"}]}"#,
        )
        .unwrap();

        let mut library = ContentLibrary::new();
        library.add_rules("rules.json", rules).unwrap();
        assert!(matches!(library.validate(), Err(ContentError::Invalid { .. })));
    }

    #[test]
    fn test_rule_without_requirements_is_invalid() {
        let rules: EmergenceRuleCollection = parse_document(
            "rules",
            r#"{"emergentProperties": [{"name": "Nothing",
                "conditions": {"requiredThreadTypes": []},
                "consciousnessExpansion": {"expandedSelfAwareness": "x"}}]}"#,
        )
        .unwrap();

        let mut library = ContentLibrary::new();
        library.add_rules("rules.json", rules).unwrap();
        assert!(library.validate().is_err());
    }

    #[test]
    fn test_bad_trigger_tag_fails_document() {
        let result: Result<StoryBeatCollection, _> = parse_document(
            "beats.json",
            r#"{"beats": [
                {"id": "ok", "name": "Ok", "trigger": {"type": "threadCreated", "count": 1}},
                {"id": "bad", "name": "Bad", "trigger": {"type": "moonRises"}}
            ]}"#,
        );
        assert!(matches!(result, Err(ContentError::Json { .. })));
    }

    #[test]
    fn test_merge_dir() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("beats")).unwrap();
        fs::create_dir_all(dir.path().join("dialogue")).unwrap();
        fs::write(
            dir.path().join("beats/extra.json"),
            r#"{"beats": [{"id": "b_extra", "name": "Extra",
                "trigger": {"type": "threadCreated", "count": 9}}]}"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("dialogue/city.json"),
            r#"{"speaker": "city", "dialogueFragments": [{"id": "city_extra",
                "speaker": "city", "fragments": ["Hello again."], "context": "farewell"}]}"#,
        )
        .unwrap();
        fs::write(dir.path().join("beats/readme.txt"), "not json").unwrap();

        let mut library = ContentLibrary::builtin().unwrap();
        let beats_before = library.beats.len();
        let dialogue_before = library.dialogue.len();
        library.merge_dir(dir.path()).unwrap();
        library.validate().unwrap();

        assert_eq!(library.beats.len(), beats_before + 1);
        assert_eq!(library.dialogue.len(), dialogue_before + 1);
    }

    #[test]
    fn test_from_dir_reports_bad_json() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("emergence")).unwrap();
        fs::write(dir.path().join("emergence/broken.json"), "{").unwrap();

        match ContentLibrary::from_dir(dir.path()) {
            Err(ContentError::Json { document, .. }) => assert!(document.ends_with("broken.json")),
            other => panic!("expected decode error, got {:?}", other.map(|l| l.rules.len())),
        }
    }
}
