//! # Prompt Templates
//!
//! The text the assistant sends to the model, plus the helpers that pull SQL and
//! Python back out of the model's answers. Prompts are assembled as message logs
//! (see [`crate::types::ChatMessage`]) and flattened by the provider.

use regex::Regex;

/// Marker the model uses to ask for a look at the data before answering.
pub const INTERMEDIATE_SQL_MARKER: &str = "intermediate_sql";

/// Placeholders: `{dialect}`
pub const DEFAULT_SQL_SYSTEM_PROMPT: &str = "You are a {dialect} expert. Please help to generate a SQL query to answer the question. Your response should ONLY be based on the given context and follow the response guidelines and format instructions. ";

/// Placeholders: `{dialect}`
pub const SQL_RESPONSE_GUIDELINES: &str = "===Response Guidelines \n\
1. If the provided context is sufficient, please generate a valid SQL query without any explanations for the question. \n\
2. If the provided context is almost sufficient but requires knowledge of a specific string in a particular column, please generate an intermediate SQL query to find the distinct strings in that column. Prepend the query with a comment saying intermediate_sql \n\
3. If the provided context is insufficient, please explain why it can't be generated. \n\
4. Please use the most relevant table(s). \n\
5. If the question has been asked and answered before, please repeat the answer exactly as it was given before. \n\
6. Ensure that the output SQL is {dialect}-compliant and executable, and free of syntax errors. \n";

pub const QUESTION_FROM_SQL_SYSTEM_PROMPT: &str = "The user will give you SQL and you will try to guess what the business question this query is answering. Return just the question without any additional explanation. Do not reference the table name in the question.";

pub const PLOTLY_CODE_USER_PROMPT: &str = "Can you generate the Python plotly code to chart the results of the dataframe? Assume the data is in a pandas dataframe called 'df'. If there is only one value in the dataframe, use an Indicator. Respond with only Python code. Do not answer with any explanations -- just the code.";

pub const SUMMARY_USER_PROMPT: &str = "Briefly summarize the data based on the question that was asked. Do not respond with any additional explanation beyond the summary.";

/// Placeholders: `{n_questions}`
pub const FOLLOWUP_USER_PROMPT: &str = "Generate a list of {n_questions} followup questions that the user might ask about this data. Respond with a list of questions, one per line. Do not answer with any explanations -- just the questions. Remember that there should be an unambiguous SQL query that can be generated from the question. Prefer questions that are answerable outside of the context of this conversation. Prefer questions that are slight modifications of the SQL query that was generated that allow digging deeper into the data. Each question will be turned into a button that the user can click to generate a new SQL query so don't use 'example' type questions. Each question must have a one-to-one correspondence with an instantiated SQL query.";

/// Rough token count used for prompt budgeting.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / 4
}

/// Suffix asking the model to answer in a given language, or nothing.
pub fn response_language(language: Option<&str>) -> String {
    match language {
        Some(lang) if !lang.trim().is_empty() => format!(" Respond in the {lang} language."),
        _ => String::new(),
    }
}

/// Appends a titled section of snippets while they fit in the token budget.
pub fn append_within_budget(
    prompt: &mut String,
    title: &str,
    snippets: &[String],
    max_tokens: usize,
) {
    let mut titled = false;
    for snippet in snippets {
        let title_cost = if titled { 0 } else { estimate_tokens(title) };
        if estimate_tokens(prompt) + title_cost + estimate_tokens(snippet) < max_tokens {
            if !titled {
                prompt.push_str(title);
                titled = true;
            }
            prompt.push_str(snippet);
            prompt.push_str("\n\n");
        }
    }
}

/// Pulls the SQL statement out of a model response.
///
/// Tried in order, taking the last match of the first pattern that matches:
/// a `WITH ... ;` statement, a `SELECT ... ;` statement, a fenced `sql` block,
/// any fenced block. Falls back to the trimmed response.
pub fn extract_sql(response: &str) -> Result<String, regex::Error> {
    let patterns = [
        r"(?is)\bWITH\b .*?;",
        r"(?is)\bSELECT\b .*?;",
        r"(?is)```sql\s*\n(.*?)```",
        r"(?s)```(.*?)```",
    ];
    for pattern in patterns {
        let re = Regex::new(pattern)?;
        if let Some(caps) = re.captures_iter(response).last() {
            let matched = caps.get(1).or_else(|| caps.get(0));
            if let Some(m) = matched {
                return Ok(m.as_str().trim().to_string());
            }
        }
    }
    Ok(response.trim().to_string())
}

/// Pulls Python code out of a fenced block, or returns the response as-is.
pub fn extract_python_code(response: &str) -> Result<String, regex::Error> {
    let re = Regex::new(r"(?s)```(?:python)?\s*\n(.*?)```")?;
    let code = re
        .captures_iter(response)
        .next()
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| response.trim().to_string());
    Ok(code)
}

/// Drops `fig.show()` calls; the front-end decides when to display the figure.
pub fn sanitize_plotly_code(code: &str) -> String {
    code.lines()
        .filter(|line| line.trim() != "fig.show()")
        .collect::<Vec<_>>()
        .join("\n")
}

/// Strips leading list numbering such as `1. ` or `2) `.
pub fn strip_numbering(line: &str) -> String {
    let trimmed = line.trim();
    let digits = trimmed.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return trimmed.to_string();
    }
    let rest = &trimmed[digits..];
    match rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
        Some(question) => question.trim_start().to_string(),
        None => trimmed.to_string(),
    }
}

/// Removes `--` line comments and `/* */` block comments.
fn strip_sql_comments(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '-' if chars.peek() == Some(&'-') => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }
    out
}

/// True if any statement in `sql` is a `SELECT`, including `WITH ... SELECT`.
pub fn is_select_statement(sql: &str) -> bool {
    strip_sql_comments(sql).split(';').any(|statement| {
        let upper = statement
            .trim_start_matches(|c: char| c.is_whitespace() || c == '(')
            .to_uppercase();
        if upper.starts_with("SELECT") {
            return true;
        }
        if upper.starts_with("WITH") {
            let words: Vec<&str> = upper
                .split(|c: char| !c.is_ascii_alphanumeric() && c != '_')
                .filter(|w| !w.is_empty())
                .collect();
            let has_write = words
                .iter()
                .any(|w| matches!(*w, "INSERT" | "UPDATE" | "DELETE" | "MERGE"));
            return !has_write && words.contains(&"SELECT");
        }
        false
    })
}
