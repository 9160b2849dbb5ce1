use minijinja::{context, Environment};
use serde::Serialize;

const WIDGET_TEMPLATE: &str = include_str!("templates/widget.html.j2");

#[derive(Debug, Clone, Serialize)]
pub struct QuickTopic {
    pub label: &'static str,
    pub message: &'static str,
}

pub const QUICK_TOPICS: &[QuickTopic] = &[
    QuickTopic {
        label: "Billing",
        message: "I have a billing question",
    },
    QuickTopic {
        label: "Technical",
        message: "I need technical support",
    },
    QuickTopic {
        label: "Account",
        message: "Help with my account",
    },
    QuickTopic {
        label: "Cancel",
        message: "How to cancel my subscription?",
    },
    QuickTopic {
        label: "Live chat",
        message: "I want to speak to someone",
    },
];

pub struct WidgetContext<'a> {
    pub title: &'a str,
    pub greeting: &'a str,
    pub quick_topics: &'a [QuickTopic],
    /// Value for the file input's `accept` attribute, e.g. ".txt,.pdf".
    pub accept: &'a str,
}

pub fn render_widget(ctx: &WidgetContext<'_>) -> String {
    let mut env = Environment::new();
    // the .html suffix turns on HTML auto-escaping
    if env.add_template("widget.html", WIDGET_TEMPLATE).is_err() {
        return fallback_widget(ctx);
    }

    let Ok(template) = env.get_template("widget.html") else {
        return fallback_widget(ctx);
    };

    template
        .render(context! {
            title => ctx.title,
            greeting => ctx.greeting,
            quick_topics => ctx.quick_topics,
            accept => ctx.accept,
        })
        .unwrap_or_else(|err| {
            tracing::warn!(error = %err, "widget template failed to render");
            fallback_widget(ctx)
        })
}

fn fallback_widget(ctx: &WidgetContext<'_>) -> String {
    format!(
        "<!DOCTYPE html><html><head><title>{title}</title></head>\
         <body><h1>{title}</h1><p>{greeting}</p></body></html>",
        title = escape_html(ctx.title),
        greeting = escape_html(ctx.greeting),
    )
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
