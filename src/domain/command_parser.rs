//! Chat Command Parser
//!
//! 将聊天消息解析为命令。命令以固定前缀开头（如 `!play lofi`），
//! 选择回复是不带前缀的纯数字（`1`-`10`）。

/// 搜索结果最多展示/选择的数量
pub const MAX_SELECTION: usize = 10;

/// 聊天命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Help,
    Ping,
    /// 参数可能为空，由处理器回复提示
    Play(String),
    Search(String),
    /// 1-based 的选择序号
    Select(usize),
    Queue,
    Skip,
    Stop,
    Pause,
    Resume,
}

impl ChatCommand {
    pub fn name(&self) -> &'static str {
        match self {
            ChatCommand::Help => "help",
            ChatCommand::Ping => "ping",
            ChatCommand::Play(_) => "play",
            ChatCommand::Search(_) => "search",
            ChatCommand::Select(_) => "select",
            ChatCommand::Queue => "queue",
            ChatCommand::Skip => "skip",
            ChatCommand::Stop => "stop",
            ChatCommand::Pause => "pause",
            ChatCommand::Resume => "resume",
        }
    }
}

/// 解析一条消息
///
/// 返回 None 表示该消息不是命令（普通聊天、未知命令、越界数字等）
pub fn parse_command(prefix: &str, text: &str) -> Option<ChatCommand> {
    let text = text.trim();

    if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
        return text
            .parse::<usize>()
            .ok()
            .filter(|n| (1..=MAX_SELECTION).contains(n))
            .map(ChatCommand::Select);
    }

    let body = text.strip_prefix(prefix)?;
    let (name, args) = match body.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (body, ""),
    };

    let command = match name.to_lowercase().as_str() {
        "help" => ChatCommand::Help,
        "ping" => ChatCommand::Ping,
        "play" => ChatCommand::Play(args.to_string()),
        "search" => ChatCommand::Search(args.to_string()),
        "queue" => ChatCommand::Queue,
        "skip" => ChatCommand::Skip,
        "stop" => ChatCommand::Stop,
        "pause" => ChatCommand::Pause,
        "resume" => ChatCommand::Resume,
        _ => return None,
    };

    Some(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_play_with_query() {
        assert_eq!(
            parse_command("!", "!play lofi beats"),
            Some(ChatCommand::Play("lofi beats".to_string()))
        );
        assert_eq!(
            parse_command("!", "  !PLAY   lofi  "),
            Some(ChatCommand::Play("lofi".to_string()))
        );
    }

    #[test]
    fn test_parse_play_without_query() {
        assert_eq!(parse_command("!", "!play"), Some(ChatCommand::Play(String::new())));
        assert_eq!(parse_command("!", "!search  "), Some(ChatCommand::Search(String::new())));
    }

    #[test]
    fn test_parse_plain_commands() {
        assert_eq!(parse_command("!", "!help"), Some(ChatCommand::Help));
        assert_eq!(parse_command("!", "!ping"), Some(ChatCommand::Ping));
        assert_eq!(parse_command("!", "!queue"), Some(ChatCommand::Queue));
        assert_eq!(parse_command("!", "!skip"), Some(ChatCommand::Skip));
        assert_eq!(parse_command("!", "!stop"), Some(ChatCommand::Stop));
        assert_eq!(parse_command("!", "!pause"), Some(ChatCommand::Pause));
        assert_eq!(parse_command("!", "!resume"), Some(ChatCommand::Resume));
    }

    #[test]
    fn test_parse_selection_range() {
        assert_eq!(parse_command("!", "1"), Some(ChatCommand::Select(1)));
        assert_eq!(parse_command("!", " 10 "), Some(ChatCommand::Select(10)));
        assert_eq!(parse_command("!", "0"), None);
        assert_eq!(parse_command("!", "11"), None);
        assert_eq!(parse_command("!", "99999999999999999999999"), None);
    }

    #[test]
    fn test_parse_ignores_non_commands() {
        assert_eq!(parse_command("!", "hello there"), None);
        assert_eq!(parse_command("!", "!playlist rock"), None);
        assert_eq!(parse_command("!", "!unknown"), None);
        assert_eq!(parse_command("!", ""), None);
        assert_eq!(parse_command("!", "3 songs please"), None);
    }

    #[test]
    fn test_parse_custom_prefix() {
        assert_eq!(parse_command("?!", "?!skip"), Some(ChatCommand::Skip));
        assert_eq!(parse_command("?!", "!skip"), None);
    }
}
