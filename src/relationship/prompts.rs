//! 阶段提示词
//!
//! 每个关系阶段一份人设片段，内置默认文案，config/prompts/ 下的同名文件可覆盖
//! （base.txt 与 stage_<n>_<slug>.txt）。片段里的 {scores} 标记在读取时替换为
//! 当前三维分数；某阶段没有模板时退化为只含阶段号的最小片段。全程只读。

use std::collections::HashMap;
use std::path::Path;

use crate::relationship::state::{RelationshipSnapshot, Stage};

/// 分数注入标记
const SCORES_MARKER: &str = "{scores}";

const DEFAULT_BASE: &str = "你是「恋恋」，一个温柔真诚的聊天伙伴。\
回复口语化、简短自然，像在手机上打字。\
一次想说几句话时，用 </> 把回复拆成几段，像真人连发几条消息。";

fn default_template(stage: Stage) -> &'static str {
    match stage {
        Stage::Stranger => {
            "【阶段：陌生期】\n系统分析：{scores}\n\
             你们刚认识不久。保持礼貌友好，回应克制，\
             不主动打听隐私，也不表现得过分热情。"
        }
        Stage::Familiar => {
            "【阶段：熟悉期】\n系统分析：{scores}\n\
             你们已经聊得比较多了。语气可以放松一些，\
             可以开玩笑、主动分享日常，记得对方提过的事。"
        }
        Stage::Close => {
            "【阶段：亲近期】\n系统分析：{scores}\n\
             你们是可以说心里话的朋友。可以谈感受、给安慰，\
             偶尔表达在意对方，但不越界。"
        }
        Stage::Intimate => {
            "【阶段：暧昧期】\n系统分析：{scores}\n\
             你们之间有明显的好感。语气亲昵，会撒娇、会想念，\
             对情绪变化敏感，认真对待每一句话。"
        }
    }
}

/// 阶段提示词集合：基础人设 + 每阶段一份模板
pub struct StagePrompts {
    base: String,
    templates: HashMap<Stage, String>,
}

impl Default for StagePrompts {
    fn default() -> Self {
        Self::defaults()
    }
}

impl StagePrompts {
    /// 内置默认文案 + 默认目录下的文件覆盖（目录不存在就纯用内置）
    pub fn new() -> Self {
        ["config/prompts", "../config/prompts"]
            .iter()
            .map(Path::new)
            .find(|p| p.is_dir())
            .map(Self::load_from_dir)
            .unwrap_or_else(Self::defaults)
    }

    /// 纯内置默认文案
    pub fn defaults() -> Self {
        let templates = Stage::ALL
            .iter()
            .map(|&s| (s, default_template(s).to_string()))
            .collect();
        Self {
            base: DEFAULT_BASE.to_string(),
            templates,
        }
    }

    /// 在内置默认的基础上，用目录里存在的文件逐个覆盖
    pub fn load_from_dir(dir: &Path) -> Self {
        let mut prompts = Self::defaults();

        if let Ok(base) = std::fs::read_to_string(dir.join("base.txt")) {
            prompts.base = base;
        }
        for stage in Stage::ALL {
            let filename = format!("stage_{}_{}.txt", stage.number(), stage.slug());
            if let Ok(template) = std::fs::read_to_string(dir.join(filename)) {
                prompts.templates.insert(stage, template);
            }
        }
        prompts
    }

    /// 阶段片段：模板中的 {scores} 替换为当前分数（一位小数）；
    /// 无模板时返回只含阶段号的最小片段
    pub fn context_for(&self, snapshot: &RelationshipSnapshot) -> String {
        let scores = format!(
            "当前分数 [熟悉{:.1} 信任{:.1} 亲密{:.1}]",
            snapshot.familiarity, snapshot.trust, snapshot.intimacy
        );
        match self.templates.get(&snapshot.stage) {
            Some(template) => template.replacen(SCORES_MARKER, &scores, 1),
            None => format!("当前关系阶段: {}", snapshot.stage.number()),
        }
    }

    /// 完整系统提示词：基础人设 + 阶段片段
    pub fn system_prompt(&self, snapshot: &RelationshipSnapshot) -> String {
        format!("{}\n\n{}", self.base, self.context_for(snapshot))
    }
}
