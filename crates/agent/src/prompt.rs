//! Prompt text: the system prompt, the first message of a chat, and the
//! follow-up that carries tool results back to the model.

use modai_core::tool::{ToolInfo, ToolResult};
use modai_protocol::{Directive, PROTOCOL};
use serde_json::Value;

const PERSONA: &str = "You are modai, a capable assistant that can act on the user's machine \
through tools. Answer in plain language and call a tool whenever the request needs one.";

/// Build the system prompt: persona, protocol description, one example per tool.
///
/// `persona` replaces the built-in opening paragraph only; the protocol
/// description and tool list are always appended.
pub fn system_prompt(persona: Option<&str>, tools: &[ToolInfo]) -> String {
    let mut prompt = String::from(persona.map(str::trim).unwrap_or(PERSONA));
    prompt.push_str("\n\n## Calling tools\n");
    prompt.push_str(&format!(
        "To call a tool, write a single-line JSON object anywhere in your reply:\n\
         {{\"protocol\":\"{PROTOCOL}\",\"tool\":\"<name>\",\"arguments\":{{...}}}}\n\
         The object must be valid JSON with `protocol` set to \"{PROTOCOL}\". \
         Tool results arrive in the next message.\n"
    ));

    if tools.is_empty() {
        prompt.push_str("\nNo tools are available in this session.\n");
        return prompt;
    }

    prompt.push_str("\n## Available tools\n");
    for tool in tools {
        let example = format!(
            "{{\"protocol\":\"{PROTOCOL}\",\"tool\":{},\"arguments\":{}}}",
            Value::String(tool.name.clone()),
            tool.example
        );
        prompt.push_str(&format!(
            "\n### {}\n{}\nExample: {example}\n",
            tool.name, tool.description
        ));
    }
    prompt
}

/// The opening message of a chat: the user's text plus the single-response instruction.
pub fn first_message(user_message: &str) -> String {
    format!(
        "{user_message}\n\n\
         (If this request needs tools, emit every tool call it requires in this one response.)"
    )
}

/// One context line per executed directive.
pub fn context_line(directive: &Directive, result: &ToolResult) -> String {
    let arguments = Value::Object(directive.arguments().clone());
    let outcome = if result.success {
        match &result.data {
            Some(Value::String(s)) => format!("result: {s}"),
            Some(data) => format!("result: {data}"),
            None => "result: (no output)".to_string(),
        }
    } else {
        format!(
            "error: {}",
            result.error.as_deref().unwrap_or("unknown error")
        )
    };
    format!("Tool `{}` called with {arguments} -> {outcome}", directive.tool())
}

/// The follow-up message: the previous response restated, then the results.
pub fn follow_up(previous_response: &str, lines: &[String]) -> String {
    let mut message = format!("Your previous response was:\n{previous_response}\n\nTool results:\n");
    for line in lines {
        message.push_str("- ");
        message.push_str(line);
        message.push('\n');
    }
    message.push_str(
        "\nContinue with the user's request using these results. \
         Call more tools only if they are still needed; otherwise give the final answer.",
    );
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, json};

    fn directive(tool: &str, args: Value) -> Directive {
        let Value::Object(map) = args else {
            panic!("arguments must be an object")
        };
        Directive::new(tool, map).unwrap()
    }

    #[test]
    fn system_prompt_lists_tool_examples() {
        let tools = vec![ToolInfo {
            name: "roll_dice".into(),
            description: "Roll dice".into(),
            example: json!({ "dice": "2d6" }),
        }];
        let prompt = system_prompt(None, &tools);
        assert!(prompt.contains("### roll_dice"));
        assert!(prompt.contains(
            r#"Example: {"protocol":"modai","tool":"roll_dice","arguments":{"dice":"2d6"}}"#
        ));
    }

    #[test]
    fn persona_override_keeps_protocol_and_tools() {
        let tools = vec![ToolInfo {
            name: "exec".into(),
            description: "Run a shell command".into(),
            example: json!({ "command": "ls" }),
        }];
        let prompt = system_prompt(Some("You are a terse pirate.\n"), &tools);
        assert!(prompt.starts_with("You are a terse pirate.\n\n## Calling tools"));
        assert!(!prompt.contains("You are modai"));
        assert!(prompt.contains(r#"{"protocol":"modai","tool":"<name>","arguments":{...}}"#));
        assert!(prompt.contains("### exec"));
    }

    #[test]
    fn system_prompt_without_tools() {
        assert!(system_prompt(None, &[]).contains("No tools are available"));
    }

    #[test]
    fn first_message_keeps_user_text() {
        let message = first_message("list my files");
        assert!(message.starts_with("list my files"));
        assert!(message.contains("one response"));
    }

    #[test]
    fn context_line_for_success_and_failure() {
        let call = directive("exec", json!({ "command": "ls" }));
        let ok = context_line(&call, &ToolResult::ok(json!({ "stdout": "a.txt" })));
        assert_eq!(
            ok,
            r#"Tool `exec` called with {"command":"ls"} -> result: {"stdout":"a.txt"}"#
        );

        let failed = context_line(&call, &ToolResult::failure("boom"));
        assert_eq!(failed, r#"Tool `exec` called with {"command":"ls"} -> error: boom"#);
    }

    #[test]
    fn string_data_is_unquoted() {
        let call = Directive::new("read_file", Map::new()).unwrap();
        let line = context_line(&call, &ToolResult::ok("hello"));
        assert!(line.ends_with("result: hello"));
    }

    #[test]
    fn follow_up_restates_previous_response_in_order() {
        let message = follow_up("I'll check.", &["first".into(), "second".into()]);
        assert!(message.starts_with("Your previous response was:\nI'll check."));
        let first = message.find("- first").unwrap();
        let second = message.find("- second").unwrap();
        assert!(first < second);
    }
}
