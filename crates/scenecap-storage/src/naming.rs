//! 저장 파일 이름/폴더 규칙.
//!
//! 파일명 패턴 토큰:
//! - `{date}` `YYYY-MM-DD`
//! - `{time}` `HH-MM-SS`
//! - `{timestamp}` Unix 밀리초
//! - `{surface}` 서피스 ID (`screen:1` → `screen_1`)
//! - `{id}` 항목 UUID
//! - `{scene}` 컨텍스트 장면 이름 (없으면 `scene`/`frame`)
//!
//! 패턴에 `{id}`가 없으면 충돌 방지를 위해 짧은 ID를 붙인다.

use chrono::{DateTime, Utc};
use scenecap_core::config::Organization;
use scenecap_core::models::frame::{ContextTags, FrameMetadata};
use std::path::PathBuf;
use uuid::Uuid;

/// 파일명 최대 길이 (확장자 제외)
const MAX_STEM_LEN: usize = 120;

/// 태그 이름이 없을 때 by-game 폴더
pub const UNKNOWN_GROUP: &str = "unknown";

/// 파일명 생성에 필요한 값
pub struct NamingContext<'a> {
    pub id: Uuid,
    pub metadata: &'a FrameMetadata,
    pub context_tags: Option<&'a ContextTags>,
}

/// 패턴 적용 → 확장자 포함 파일명
pub fn file_name(pattern: &str, ctx: &NamingContext<'_>) -> String {
    let ts = ctx.metadata.timestamp;
    let scene = ctx
        .context_tags
        .and_then(|t| t.scene.as_deref())
        .map(str::to_string)
        .unwrap_or_else(|| {
            if ctx.metadata.is_scene_change {
                "scene".to_string()
            } else {
                "frame".to_string()
            }
        });

    let body = |pattern: &str, id: &str| {
        pattern
            .replace("{date}", &ts.format("%Y-%m-%d").to_string())
            .replace("{time}", &ts.format("%H-%M-%S").to_string())
            .replace("{timestamp}", &ts.timestamp_millis().to_string())
            .replace("{surface}", &ctx.metadata.surface_id)
            .replace("{scene}", &scene)
            .replace("{id}", id)
    };

    let stem = if pattern.contains("{id}") {
        let full = sanitize(&body(pattern, &ctx.id.to_string()));
        if full.chars().count() <= MAX_STEM_LEN {
            full
        } else {
            // 길이를 줄일 때도 ID는 잘리지 않게 맨 뒤에 붙인다
            with_suffix(&body(pattern, ""), &ctx.id.to_string())
        }
    } else {
        with_suffix(&body(pattern, ""), &short_id(ctx.id))
    };
    format!("{stem}.{}", ctx.metadata.format.extension())
}

/// 본문을 `MAX_STEM_LEN`에 맞게 자른 뒤 `_<suffix>` 추가
fn with_suffix(body: &str, suffix: &str) -> String {
    let budget = MAX_STEM_LEN.saturating_sub(suffix.chars().count() + 1);
    let head = truncate(&sanitize(body), budget);
    let head = head.trim_end_matches(|c| c == '_' || c == '.');
    format!("{head}_{suffix}")
}

/// 정리 방식별 하위 폴더 (기본 경로 기준 상대)
pub fn organization_dir(
    organization: Organization,
    timestamp: DateTime<Utc>,
    context_tags: Option<&ContextTags>,
) -> PathBuf {
    match organization {
        Organization::Flat => PathBuf::new(),
        Organization::ByDate => PathBuf::from(timestamp.format("%Y-%m-%d").to_string()),
        Organization::ByGame => {
            let group = context_tags
                .and_then(|t| t.name.as_deref())
                .map(sanitize)
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| UNKNOWN_GROUP.to_string());
            PathBuf::from(group)
        }
    }
}

/// UUID 앞 8자리
pub fn short_id(id: Uuid) -> String {
    id.simple().to_string()[..8].to_string()
}

/// 파일 시스템에 안전한 문자만 남김 (나머지는 `_`)
pub fn sanitize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_underscore = false;
    for c in raw.trim().chars() {
        let keep = c.is_alphanumeric() || matches!(c, '-' | '.');
        if keep {
            out.push(c);
            last_underscore = false;
        } else if !last_underscore {
            out.push('_');
            last_underscore = true;
        }
    }
    let trimmed = out.trim_matches(|c| c == '_' || c == '.');
    if trimmed.is_empty() {
        "capture".to_string()
    } else {
        trimmed.to_string()
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
