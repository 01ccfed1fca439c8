//! Prompts for the LLM strategy.

pub const ANALYSIS_SYSTEM_PROMPT: &str = "\
You analyse the emotional tone of personal journal entries.
Reply with a single JSON object and nothing else:
{\"moodType\": \"positive\" | \"negative\" | \"neutral\", \
\"emotionScore\": integer 0-100 (0 = very negative, 50 = neutral, 100 = very positive), \
\"tags\": up to 5 short lowercase keywords naming the emotions or topics, \
\"reasoning\": one short sentence, \
\"confidence\": number between 0 and 1}";

pub const BATCH_SYSTEM_PROMPT: &str = "\
You analyse the emotional tone of personal journal entries.
You receive several numbered entries. Reply with a JSON array containing exactly one \
object per entry, in the same order, and nothing else. Each object has the shape:
{\"moodType\": \"positive\" | \"negative\" | \"neutral\", \
\"emotionScore\": integer 0-100, \
\"tags\": up to 5 short lowercase keywords, \
\"reasoning\": one short sentence, \
\"confidence\": number between 0 and 1}";

pub fn analysis_prompt(content: &str) -> String {
    format!("Journal entry:\n\"\"\"\n{}\n\"\"\"", content.trim())
}

pub fn batch_prompt(contents: &[String]) -> String {
    let mut prompt = format!(
        "There are {} entries. Return a JSON array of {} objects.\n",
        contents.len(),
        contents.len()
    );
    for (i, content) in contents.iter().enumerate() {
        prompt.push_str(&format!("\nEntry {}:\n\"\"\"\n{}\n\"\"\"\n", i + 1, content.trim()));
    }
    prompt
}
