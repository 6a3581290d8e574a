//! `!mem` command surface over the memory manager.
//!
//! Values may contain spaces: a token without `=` continues the value of the
//! previous key, so `text=El pedido 123 fue entregado conv_id=soporte`
//! yields `text = "El pedido 123 fue entregado"`.

use colloquy_core::MemoryFilter;
use colloquy_memory::MemoryManager;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

const PREFIX: &str = "!mem";

pub const MEM_USAGE: &str = "Uso: !mem <status|add|find|purge> k=v ...";
const ADD_USAGE: &str = "Uso: !mem add text=... [conv_id=...] [user_id=...]";
const FIND_USAGE: &str = "Uso: !mem find query=... [top_k=N] [conv_id=...] [user_id=...]";
const PURGE_USAGE: &str = "Uso: !mem purge conv_id=...";

const DEFAULT_CONVERSATION: &str = "default";
const DEFAULT_USER: &str = "anonymous";

/// A parsed `!mem` command.
#[derive(Debug, Clone, PartialEq)]
pub enum MemoryCommand {
    Status,
    Add {
        text: String,
        conversation_id: String,
        user_id: String,
        metadata: Map<String, Value>,
    },
    Find {
        query: String,
        top_k: Option<usize>,
        filter: MemoryFilter,
    },
    Purge {
        conversation_id: String,
    },
    /// Malformed command; carries the text to show the user
    Invalid(&'static str),
}

/// Split `k=v` tokens greedily: tokens without `=` extend the previous value.
/// Leading tokens before any key are dropped.
pub fn parse_greedy(args: &str) -> BTreeMap<String, String> {
    let mut params: BTreeMap<String, String> = BTreeMap::new();
    let mut current: Option<String> = None;

    for token in args.split_whitespace() {
        match token.split_once('=') {
            Some((key, value)) if !key.is_empty() => {
                params.insert(key.to_string(), value.to_string());
                current = Some(key.to_string());
            }
            _ => {
                if let Some(value) = current.as_ref().and_then(|k| params.get_mut(k)) {
                    if !value.is_empty() {
                        value.push(' ');
                    }
                    value.push_str(token);
                }
            }
        }
    }
    params
}

/// `None` when `message` is not a `!mem` command.
pub fn parse(message: &str) -> Option<MemoryCommand> {
    parse_in(message, &Map::new())
}

/// Like [`parse`], with `conversation_id` and `user_id` string values from
/// the caller's utterance context used as defaults for `add`.
pub fn parse_in(message: &str, caller: &Map<String, Value>) -> Option<MemoryCommand> {
    let trimmed = message.trim();
    let head = trimmed.get(..PREFIX.len())?;
    if !head.eq_ignore_ascii_case(PREFIX) {
        return None;
    }
    let rest = &trimmed[PREFIX.len()..];
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }

    let rest = rest.trim_start();
    let (sub, args) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    let mut params = parse_greedy(args);
    let nonempty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
    let caller_default = |key: &str, fallback: &str| {
        caller
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(fallback)
            .to_string()
    };

    let command = match sub.to_lowercase().as_str() {
        "status" => MemoryCommand::Status,
        "add" => match nonempty(params.remove("text")) {
            None => MemoryCommand::Invalid(ADD_USAGE),
            Some(text) => MemoryCommand::Add {
                text,
                conversation_id: nonempty(params.remove("conv_id"))
                    .unwrap_or_else(|| caller_default("conversation_id", DEFAULT_CONVERSATION)),
                user_id: nonempty(params.remove("user_id"))
                    .unwrap_or_else(|| caller_default("user_id", DEFAULT_USER)),
                metadata: params
                    .into_iter()
                    .map(|(k, v)| (k, Value::String(v)))
                    .collect(),
            },
        },
        "find" => {
            let top_k = match params.get("top_k").map(|v| v.trim().parse::<usize>()) {
                None => None,
                Some(Ok(k)) if k > 0 => Some(k),
                Some(_) => return Some(MemoryCommand::Invalid(FIND_USAGE)),
            };
            match nonempty(params.remove("query")) {
                None => MemoryCommand::Invalid(FIND_USAGE),
                Some(query) => MemoryCommand::Find {
                    query,
                    top_k,
                    filter: MemoryFilter {
                        conversation_id: nonempty(params.remove("conv_id")),
                        user_id: nonempty(params.remove("user_id")),
                    },
                },
            }
        }
        "purge" => match nonempty(params.remove("conv_id")) {
            None => MemoryCommand::Invalid(PURGE_USAGE),
            Some(conversation_id) => MemoryCommand::Purge { conversation_id },
        },
        _ => MemoryCommand::Invalid(MEM_USAGE),
    };
    Some(command)
}

/// Run a command and render its JSON reply.
pub async fn execute(memory: &mut MemoryManager, command: MemoryCommand) -> String {
    let value = match command {
        MemoryCommand::Status => serde_json::to_value(memory.status()).unwrap_or(Value::Null),
        MemoryCommand::Add {
            text,
            conversation_id,
            user_id,
            metadata,
        } => match memory
            .add_event(&conversation_id, &user_id, &text, metadata)
            .await
        {
            Some(id) => json!({ "event_id": id }),
            None => json!({ "event_id": "disabled" }),
        },
        MemoryCommand::Find {
            query,
            top_k,
            filter,
        } => {
            let hits = memory.find_similar(&query, top_k, &filter).await;
            serde_json::to_value(hits).unwrap_or_else(|_| json!([]))
        }
        MemoryCommand::Purge { conversation_id } => {
            json!({ "purged": memory.purge_conversation(&conversation_id) })
        }
        MemoryCommand::Invalid(usage) => return usage.to_string(),
    };
    value.to_string()
}
