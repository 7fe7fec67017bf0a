//! Explain command - explain diagnostic codes

use anyhow::{anyhow, Result};
use clap::Args;
use ferry_diagnostics::DiagnosticCode;
use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct ExplainArgs {
    /// Diagnostic code to explain (e.g., B001, B102)
    pub code: String,
}

struct Explanation {
    code: DiagnosticCode,
    title: &'static str,
    description: &'static str,
    example: Option<&'static str>,
    suggestion: Option<&'static str>,
    related: &'static [&'static str],
}

const EXPLANATIONS: &[Explanation] = &[
    // Script exceptions
    Explanation {
        code: DiagnosticCode::CallPropertyThrew,
        title: "Called Function Threw",
        description: "A function called from the managed side through call-property threw a script exception. The exception was presented and reported, and the call returned undefined to the managed caller.",
        example: Some("view.getX = function () { return this.missing.x; };  // TypeError"),
        suggestion: Some("Fix the script function, or catch inside it and return a value the managed side expects."),
        related: &["B002", "B003"],
    },
    Explanation {
        code: DiagnosticCode::EmitThrew,
        title: "Event Handler Threw",
        description: r#"The emitter's `emit` function threw while an event was being dispatched.

The event counts as not handled: fire-event returns false and the managed side
runs its default handling."#,
        example: Some("button.emit = function (name, e) { throw new Error(name); };"),
        suggestion: Some("Handlers that want to claim an event must return exactly `true` without throwing."),
        related: &["B001"],
    },
    Explanation {
        code: DiagnosticCode::ContextMethodThrew,
        title: "Context Method Threw",
        description: "The target's window/context method threw while a new context object was handed to it. The context was not applied by script code.",
        example: Some("view.setWindow = function (w) { w.open(); };  // w.open is not a function"),
        suggestion: Some("Make the context method tolerate partially initialized windows."),
        related: &["B001"],
    },
    Explanation {
        code: DiagnosticCode::AccessorHookFailed,
        title: "Bridged Property Hook Failed",
        description: "A bridged property was read or written, but the value could not be carried across. Either the read threw, or a script-side write could not be converted for the managed peer.",
        example: Some("view.title = cyclicObject;  // nests too deep to convert"),
        suggestion: Some("Assign plain values (strings, numbers, flat objects, arrays) to bridged properties."),
        related: &["B001"],
    },
    // Lifecycle
    Explanation {
        code: DiagnosticCode::ReleaseWhileAttached,
        title: "Release of Attached Proxy",
        description: r#"The managed side asked to release a proxy it had not detached.

Releases are only honored for detached proxies; the proxy stays alive and the
release returns false. This usually means a teardown path skipped detach."#,
        example: None,
        suggestion: Some("Detach the proxy before releasing it."),
        related: &["B102"],
    },
    Explanation {
        code: DiagnosticCode::StaleHandle,
        title: "Stale Handle",
        description: "A boundary call carried a handle that no longer refers to a live proxy. The proxy was released earlier; its handle is never reused.",
        example: None,
        suggestion: Some("Clear the stored handle on the managed object when its proxy is released."),
        related: &["B101"],
    },
];

static INDEX: Lazy<HashMap<&'static str, &'static Explanation>> =
    Lazy::new(|| EXPLANATIONS.iter().map(|e| (e.code.as_str(), e)).collect());

pub fn run(args: ExplainArgs, format: OutputFormat, use_color: bool) -> Result<()> {
    let code = args.code.trim().to_uppercase();

    let explanation = INDEX
        .get(code.as_str())
        .ok_or_else(|| anyhow!("Unknown diagnostic code: {}", code))?;
    let severity = explanation.code.default_severity();

    match format {
        OutputFormat::Text => {
            if use_color {
                println!(
                    "\n{}: {}\n{}",
                    console::style(&code).bold().cyan(),
                    console::style(explanation.title).bold(),
                    "=".repeat(code.len() + explanation.title.len() + 2)
                );
            } else {
                println!(
                    "\n{}: {}\n{}",
                    code,
                    explanation.title,
                    "=".repeat(code.len() + explanation.title.len() + 2)
                );
            }

            println!("\nSeverity: {}", severity);
            println!("\n{}\n", explanation.description);

            if let Some(example) = explanation.example {
                if use_color {
                    println!("{}:", console::style("Example").bold());
                } else {
                    println!("Example:");
                }
                for line in example.lines() {
                    println!("  {}", line);
                }
                println!();
            }

            if let Some(suggestion) = explanation.suggestion {
                if use_color {
                    println!("{}:", console::style("Suggestion").bold().green());
                } else {
                    println!("Suggestion:");
                }
                for line in suggestion.lines() {
                    println!("  {}", line);
                }
                println!();
            }

            if !explanation.related.is_empty() {
                if use_color {
                    println!(
                        "{}: {}",
                        console::style("Related").dim(),
                        explanation.related.join(", ")
                    );
                } else {
                    println!("Related: {}", explanation.related.join(", "));
                }
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "code": code,
                "severity": severity.as_str(),
                "title": explanation.title,
                "description": explanation.description,
                "example": explanation.example,
                "suggestion": explanation.suggestion,
                "related": explanation.related,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
