//! Inline text tokens in player-facing strings

use crate::domain::entities::EventInstance;
use crate::domain::player::Player;
use crate::domain::value_objects::{VariableRef, VariableScope, VariableValue};
use crate::runtime::world::World;
use chrono::Timelike;

/// What a templater may read while expanding a string
pub struct TemplateContext<'a> {
    pub world: &'a World,
    pub player: &'a Player,
    pub instance: Option<&'a EventInstance>,
}

/// Expands inline tokens before text is sent to a client
pub trait TextTemplater: Send + Sync {
    fn expand(&self, text: &str, ctx: &TemplateContext<'_>) -> String;
}

/// Default token set
///
/// | token | value |
/// |---|---|
/// | `\pn` | player name |
/// | `\pg` | guild name |
/// | `\th` `\tmh` `\tm` `\ts` `\tp` | 12h hour, 24h hour, minute, second, AM/PM |
/// | `\onlinecount` `\onlinelist` | online players |
/// | `\en` `\param` | event name, start parameter |
/// | `\evtparams` `\evtparam{key}` | event parameters |
/// | `\pv{id}` `\sv{id}` `\gv{id}` `\uv{id}` | variable by text id |
pub struct StandardTemplater;

// Longer tokens sharing a prefix come first
const SIMPLE_TOKENS: [&str; 12] = [
    "\\pn",
    "\\pg",
    "\\tmh",
    "\\th",
    "\\tm",
    "\\ts",
    "\\tp",
    "\\onlinecount",
    "\\onlinelist",
    "\\en",
    "\\param",
    "\\evtparams",
];

const VARIABLE_TOKENS: [(&str, VariableScope); 4] = [
    ("\\pv{", VariableScope::Player),
    ("\\sv{", VariableScope::Server),
    ("\\gv{", VariableScope::Guild),
    ("\\uv{", VariableScope::User),
];

impl TextTemplater for StandardTemplater {
    /// Single left-to-right pass; substituted values are never rescanned
    fn expand(&self, text: &str, ctx: &TemplateContext<'_>) -> String {
        if !text.contains('\\') {
            return text.to_string();
        }

        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find('\\') {
            out.push_str(&rest[..start]);
            rest = &rest[start..];
            let consumed = match expand_token(rest, ctx) {
                Some((value, len)) => {
                    out.push_str(&value);
                    len
                }
                None => {
                    let len = braced_token(rest).map_or(1, |(_, _, len)| len);
                    out.push_str(&rest[..len]);
                    len
                }
            };
            rest = &rest[consumed..];
        }
        out.push_str(rest);
        out
    }
}

/// Value and byte length of the token at the start of `text`
fn expand_token(text: &str, ctx: &TemplateContext<'_>) -> Option<(String, usize)> {
    if let Some((prefix, key, len)) = braced_token(text) {
        let value = if prefix == "\\evtparam{" {
            ctx.instance?.parameters().get(key).cloned()
        } else {
            VARIABLE_TOKENS
                .iter()
                .find(|(candidate, _)| *candidate == prefix)
                .and_then(|(_, scope)| variable_token(*scope, key, ctx))
        };
        return value.map(|value| (value, len));
    }
    SIMPLE_TOKENS
        .iter()
        .find(|token| text.starts_with(**token))
        .map(|token| (simple_token(token, ctx), token.len()))
}

fn variable_token(scope: VariableScope, text_id: &str, ctx: &TemplateContext<'_>) -> Option<String> {
    let descriptor = ctx.world.descriptors().variable_by_text_id(scope, text_id)?;
    let value = ctx
        .world
        .stored_variable(ctx.player, VariableRef::new(scope, descriptor.id))
        .cloned()
        .unwrap_or_else(|| VariableValue::zero(descriptor.data_type));
    Some(value.to_string())
}

/// Prefix, key and total length of a `prefix key }` token at the start of `text`
fn braced_token(text: &str) -> Option<(&'static str, &str, usize)> {
    let prefix = VARIABLE_TOKENS
        .iter()
        .map(|(prefix, _)| *prefix)
        .chain(std::iter::once("\\evtparam{"))
        .find(|prefix| text.starts_with(*prefix))?;
    let after = &text[prefix.len()..];
    let end = after.find('}')?;
    Some((prefix, &after[..end], prefix.len() + end + 1))
}

fn simple_token(token: &str, ctx: &TemplateContext<'_>) -> String {
    let time = ctx.world.clock().local_time();
    let player = ctx.player;
    match token {
        "\\pn" => player.name.clone(),
        "\\pg" => player
            .guild
            .and_then(|id| ctx.world.guild(id))
            .map(|guild| guild.name.clone())
            .unwrap_or_default(),
        "\\tmh" => format!("{:02}", time.hour()),
        "\\th" => time.hour12().1.to_string(),
        "\\tm" => format!("{:02}", time.minute()),
        "\\ts" => format!("{:02}", time.second()),
        "\\tp" => (if time.hour12().0 { "PM" } else { "AM" }).to_string(),
        "\\onlinecount" => ctx.world.online_count().to_string(),
        "\\onlinelist" => ctx.world.online_player_names(player).join(", "),
        "\\en" => ctx
            .instance
            .map(|instance| instance.name().to_string())
            .unwrap_or_default(),
        "\\param" => ctx
            .instance
            .map(|instance| instance.param().to_string())
            .unwrap_or_default(),
        "\\evtparams" => ctx
            .instance
            .map(|instance| {
                instance
                    .parameters()
                    .iter()
                    .map(|(key, value)| format!("{key}: {value}"))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default(),
        _ => String::new(),
    }
}
