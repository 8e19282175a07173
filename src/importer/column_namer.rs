// ==========================================
// 表格导入系统 - 列名清洗与去重
// ==========================================
// 规则:
// 1. 表头为空/空白 → 先合成 Column<列号>
// 2. 只保留字母、数字、下划线
// 3. 结果为空或以数字开头 → 前缀 "_"
// 4. 从左到右去重: 首个保留原名，后续依次追加 _1, _2, ...
// 5. 去重不区分大小写（SQLite 列名不区分大小写），保留名同样参与去重
// ==========================================

use std::collections::HashSet;

/// 清洗单个表头为基础列名
///
/// # 参数
/// - raw: 表头原文（可能为空）
/// - index: 列号（用于合成空表头）
pub fn sanitize_column_name(raw: &str, index: usize) -> String {
    let source = if raw.trim().is_empty() {
        format!("Column{}", index)
    } else {
        raw.to_string()
    };

    let mut sanitized: String = source
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect();

    let starts_with_digit = sanitized.chars().next().map_or(false, |c| c.is_numeric());
    if sanitized.is_empty() || starts_with_digit {
        sanitized.insert(0, '_');
    }

    sanitized
}

// ==========================================
// ColumnNamer - 有状态的去重器
// ==========================================
// 同一表头序列总是得到同一组列名（顺序相关）
#[derive(Debug, Default)]
pub struct ColumnNamer {
    assigned: HashSet<String>, // 小写键
}

impl ColumnNamer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预先占用若干列名（如代理主键），表头与之重名时追加后缀
    pub fn reserving<S: AsRef<str>>(reserved: &[S]) -> Self {
        Self {
            assigned: reserved.iter().map(|r| collision_key(r.as_ref())).collect(),
        }
    }

    /// 为下一列分配唯一列名
    pub fn assign(&mut self, raw: &str, index: usize) -> String {
        let base = sanitize_column_name(raw, index);
        let unique = if self.is_taken(&base) {
            let mut counter = 1;
            loop {
                let candidate = format!("{}_{}", base, counter);
                if !self.is_taken(&candidate) {
                    break candidate;
                }
                counter += 1;
            }
        } else {
            base
        };

        self.assigned.insert(collision_key(&unique));
        unique
    }

    fn is_taken(&self, name: &str) -> bool {
        self.assigned.contains(&collision_key(name))
    }
}

fn collision_key(name: &str) -> String {
    name.to_lowercase()
}

/// 对整行表头一次性生成唯一列名（列号从 1 开始）
pub fn unique_column_names<S: AsRef<str>>(headers: &[S]) -> Vec<String> {
    let mut namer = ColumnNamer::new();
    headers
        .iter()
        .enumerate()
        .map(|(i, h)| namer.assign(h.as_ref(), i + 1))
        .collect()
}
