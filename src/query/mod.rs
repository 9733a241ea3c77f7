use std::io::{BufRead, Write};

use crate::gemini::TextGenerator;
use crate::loaders::LoadResult;
use crate::Result;

/// Concatenate normalized load results into a single context string.
///
/// Each result is flattened per its own variant; results are joined with
/// newlines in the order they were loaded.
pub fn build_context(results: &[LoadResult]) -> String {
    results
        .iter()
        .map(|result| result.context_text())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Interactive query loop over an aggregated context.
///
/// Reads queries line by line until EOF or the `exit` sentinel, sends each to
/// the model together with the context, and prints the response text and its
/// token count.
pub async fn run_query_loop<R: BufRead, W: Write>(
    model: &dyn TextGenerator,
    context: &str,
    mut input: R,
    output: &mut W,
) -> Result<()> {
    loop {
        write!(output, "Query: ")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            break;
        }

        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if query == "exit" {
            break;
        }

        let prompt = format!(
            "Answer the <>{}</> based on the context, context: {}",
            query, context
        );

        let response = model.generate(&prompt).await?;
        writeln!(output, "{}", response.text)?;

        let tokens = model.count_tokens(&response.text).await?;
        writeln!(output, "Tokens: {}", tokens)?;
    }

    Ok(())
}
