//! 回复分段与打字延迟
//!
//! 人设提示词允许模型用 </> 把一条回复拆成几段；这里负责按标记切开、
//! 去掉空段，并按段长算出模拟打字速度的发送延迟。编排器在段与段之间 sleep。

use std::time::Duration;

/// 分段标记（与人设提示词约定一致）
pub const SEGMENT_MARKER: &str = "</>";

/// 按 </> 切分回复，去掉两端空白与空段；没有标记时整条作为唯一一段
pub fn split_reply(text: &str) -> Vec<String> {
    text.split(SEGMENT_MARKER)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

/// 按段长计算发送延迟（模拟打字速度）：10 字以内 1 秒，30 字以内 2 秒，更长 3 秒
pub fn typing_delay(text: &str) -> Duration {
    let length = text.chars().count();

    if length < 10 {
        Duration::from_secs(1)
    } else if length < 30 {
        Duration::from_secs(2)
    } else {
        Duration::from_secs(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_on_marker() {
        let parts = split_reply("今天好累</>你呢？");
        assert_eq!(parts, ["今天好累", "你呢？"]);
    }

    #[test]
    fn test_split_drops_empty_segments() {
        let parts = split_reply("  开头 </> </>结尾</>");
        assert_eq!(parts, ["开头", "结尾"]);
    }

    #[test]
    fn test_no_marker_single_part() {
        let parts = split_reply("就一条");
        assert_eq!(parts, ["就一条"]);
    }

    #[test]
    fn test_typing_delay_buckets() {
        assert_eq!(typing_delay("短"), Duration::from_secs(1));
        assert_eq!(typing_delay(&"字".repeat(15)), Duration::from_secs(2));
        assert_eq!(typing_delay(&"字".repeat(40)), Duration::from_secs(3));
    }
}
