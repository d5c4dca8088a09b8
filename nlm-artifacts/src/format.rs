//! Rendering of decoded quiz/flashcard payloads.
//!
//! Dispatch is a plain `match` over `(ContentKind, OutputFormat)`, so each
//! combination is its own function. No validation happens here; missing
//! fields render as empty text and missing lists as no entries.
use nlm_common::OutputFormat;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Quiz,
    Flashcards,
}

impl ContentKind {
    pub fn from_is_quiz(is_quiz: bool) -> Self {
        if is_quiz {
            ContentKind::Quiz
        } else {
            ContentKind::Flashcards
        }
    }
}

/// Render `payload` in `output_format`.
///
/// `html` returns `raw_html` untouched; the other formats read
/// `payload["quiz"]` or `payload["flashcards"]` depending on `is_quiz`.
///
/// ```
/// use nlm_artifacts::format_interactive_content;
/// use nlm_common::OutputFormat;
/// use serde_json::json;
///
/// let payload = json!({"flashcards": [{"f": "Front", "b": "Back"}]});
/// let out = format_interactive_content(&payload, "Cards", OutputFormat::Json, "", false);
/// assert!(out.contains(r#""front": "Front""#));
/// ```
pub fn format_interactive_content(
    payload: &Value,
    title: &str,
    output_format: OutputFormat,
    raw_html: &str,
    is_quiz: bool,
) -> String {
    render(
        payload,
        title,
        ContentKind::from_is_quiz(is_quiz),
        output_format,
        raw_html,
    )
}

pub fn render(
    payload: &Value,
    title: &str,
    kind: ContentKind,
    output_format: OutputFormat,
    raw_html: &str,
) -> String {
    match (kind, output_format) {
        (_, OutputFormat::Html) => raw_html.to_string(),
        (ContentKind::Quiz, OutputFormat::Markdown) => {
            format_quiz_markdown(title, list(payload, "quiz"))
        }
        (ContentKind::Quiz, OutputFormat::Json) => format_quiz_json(title, payload.get("quiz")),
        (ContentKind::Flashcards, OutputFormat::Markdown) => {
            format_flashcards_markdown(title, list(payload, "flashcards"))
        }
        (ContentKind::Flashcards, OutputFormat::Json) => {
            format_flashcards_json(title, list(payload, "flashcards"))
        }
    }
}

pub fn format_quiz_markdown(title: &str, questions: &[Value]) -> String {
    let mut out = format!("# {title}\n\n");
    for (i, q) in questions.iter().enumerate() {
        out.push_str(&format!("## Question {}\n", i + 1));
        out.push_str(&format!("{}\n", text(q.get("question"))));
        out.push('\n');
        for opt in list(q, "answerOptions") {
            let mark = if opt.get("isCorrect").and_then(Value::as_bool) == Some(true) {
                'x'
            } else {
                ' '
            };
            out.push_str(&format!("- [{mark}] {}\n", text(opt.get("text"))));
        }
        if let Some(hint) = q.get("hint").filter(|h| !h.is_null()) {
            out.push_str(&format!("\n**Hint:** {}\n", text(Some(hint))));
        }
        out.push('\n');
    }
    out
}

pub fn format_flashcards_markdown(title: &str, cards: &[Value]) -> String {
    let mut out = format!("# {title}\n\n");
    for (i, card) in cards.iter().enumerate() {
        out.push_str(&format!("## Card {}\n", i + 1));
        out.push_str(&format!("**Front:** {}\n\n", text(card.get("f"))));
        out.push_str(&format!("**Back:** {}\n", text(card.get("b"))));
        out.push('\n');
    }
    out
}

#[derive(Serialize)]
struct QuizDocument<'a> {
    title: &'a str,
    questions: &'a Value,
}

#[derive(Serialize)]
struct FlashcardDocument<'a> {
    title: &'a str,
    cards: Vec<Flashcard<'a>>,
}

/// Card sides keep the page's JSON value; only an absent key becomes `""`.
#[derive(Serialize)]
struct Flashcard<'a> {
    front: &'a Value,
    back: &'a Value,
}

static EMPTY_LIST: Value = Value::Array(Vec::new());
static EMPTY_TEXT: Value = Value::String(String::new());

fn format_quiz_json(title: &str, questions: Option<&Value>) -> String {
    let doc = QuizDocument {
        title,
        questions: questions.unwrap_or(&EMPTY_LIST),
    };
    serde_json::to_string_pretty(&doc).unwrap_or_default()
}

fn format_flashcards_json<'a>(title: &'a str, cards: &'a [Value]) -> String {
    let doc = FlashcardDocument {
        title,
        cards: cards
            .iter()
            .map(|c| Flashcard {
                front: c.get("f").unwrap_or(&EMPTY_TEXT),
                back: c.get("b").unwrap_or(&EMPTY_TEXT),
            })
            .collect(),
    };
    serde_json::to_string_pretty(&doc).unwrap_or_default()
}

fn list<'a>(v: &'a Value, key: &str) -> &'a [Value] {
    v.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn text(v: Option<&Value>) -> String {
    match v {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn quiz() -> Value {
        json!({"quiz": [{
            "question": "What is 2+2?",
            "answerOptions": [
                {"text": "3", "isCorrect": false},
                {"text": "4", "isCorrect": true}
            ],
            "hint": "Count on your fingers"
        }]})
    }

    #[test]
    fn quiz_markdown_marks_correct_option_and_hint() {
        let md =
            format_interactive_content(&quiz(), "Math Quiz", OutputFormat::Markdown, "", true);
        assert!(md.starts_with("# Math Quiz\n"));
        assert!(md.contains("## Question 1\nWhat is 2+2?\n"));
        assert!(md.contains("- [ ] 3\n"));
        assert!(md.contains("- [x] 4\n"));
        assert!(md.contains("**Hint:** Count on your fingers"));
    }

    #[test]
    fn quiz_markdown_numbers_questions_and_omits_missing_hint() {
        let payload = json!({"quiz": [
            {"question": "A?", "answerOptions": []},
            {"question": "B?", "answerOptions": [{"text": "yes", "isCorrect": true}], "hint": null}
        ]});
        let md = format_interactive_content(&payload, "T", OutputFormat::Markdown, "", true);
        assert!(md.contains("## Question 1\nA?"));
        assert!(md.contains("## Question 2\nB?"));
        assert!(!md.contains("**Hint:**"));
        assert!(md.contains("\n\n## Question 2"));
    }

    #[test]
    fn quiz_json_keeps_questions_verbatim() {
        let out = format_interactive_content(&quiz(), "Math Quiz", OutputFormat::Json, "", true);
        let v: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["title"], json!("Math Quiz"));
        assert_eq!(v["questions"], quiz()["quiz"]);
        assert!(out.contains("\n  \"title\": \"Math Quiz\""));
    }

    #[test]
    fn quiz_json_keeps_question_key_order() {
        let payload: Value = serde_json::from_str(
            r#"{"quiz":[{"question":"Q","answerOptions":[{"text":"a","isCorrect":true}],"hint":"h"}]}"#,
        )
        .unwrap();
        let out = format_interactive_content(&payload, "T", OutputFormat::Json, "", true);
        let question = out.find("\"question\"").unwrap();
        let options = out.find("\"answerOptions\"").unwrap();
        let hint = out.find("\"hint\"").unwrap();
        assert!(question < options && options < hint);
    }

    #[test]
    fn flashcard_json_passes_present_values_through() {
        let payload = json!({"flashcards": [{"f": 5, "b": null}, {}]});
        let out = format_interactive_content(&payload, "Cards", OutputFormat::Json, "", false);
        let v: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["cards"][0], json!({"front": 5, "back": null}));
        assert_eq!(v["cards"][1], json!({"front": "", "back": ""}));
    }

    #[test]
    fn flashcard_json_normalizes_shorthand_keys() {
        let payload = json!({"flashcards": [{"f": "Front", "b": "Back"}, {"f": "Only front"}]});
        let out = format_interactive_content(&payload, "Cards", OutputFormat::Json, "", false);
        assert!(out.contains(r#""front": "Front""#));
        assert!(!out.contains(r#""f":"#));
        assert!(!out.contains(r#""b":"#));
        let v: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["cards"][1], json!({"front": "Only front", "back": ""}));
    }

    #[test]
    fn flashcard_markdown_shows_both_sides() {
        let payload = json!({"flashcards": [{"f": "Capital of France", "b": "Paris"}]});
        let md = format_interactive_content(&payload, "Geo", OutputFormat::Markdown, "", false);
        assert!(md.contains("## Card 1"));
        assert!(md.contains("**Front:** Capital of France"));
        assert!(md.contains("**Back:** Paris"));
    }

    #[test]
    fn html_is_passthrough_for_every_kind() {
        let html = "<html><div data-app-data=\"x\"></div></html>";
        for is_quiz in [true, false] {
            for payload in [quiz(), json!(null), json!({"flashcards": 3})] {
                let out = format_interactive_content(
                    &payload,
                    "ignored",
                    OutputFormat::Html,
                    html,
                    is_quiz,
                );
                assert_eq!(out, html);
            }
        }
    }

    #[test]
    fn missing_lists_render_empty() {
        let empty = json!({});
        let md = format_interactive_content(&empty, "Empty", OutputFormat::Markdown, "", true);
        assert_eq!(md, "# Empty\n\n");
        let js = format_interactive_content(&empty, "Empty", OutputFormat::Json, "", true);
        let v: Value = serde_json::from_str(&js).unwrap();
        assert_eq!(v["questions"], json!([]));
        let cards = format_interactive_content(&empty, "Empty", OutputFormat::Json, "", false);
        let v: Value = serde_json::from_str(&cards).unwrap();
        assert_eq!(v["cards"], json!([]));
    }
}
