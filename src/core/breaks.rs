use crate::domain::model::{Budget, BreakSequence};
use crate::utils::error::{AppError, Result};

/// 遞增模式下每一段的間隔 (分鐘或公里)
pub const INCREMENT: f64 = 15.0;

/// 一個週期最多求解的 break 數量 (可由 solve.max_breaks 覆寫)
pub const DEFAULT_MAX_BREAKS: usize = 100;

/// 把預算拆成 break 序列。
///
/// 關閉遞增時只有 `[budget]`。開啟時依序產生 15、30、…直到最大的完整倍數，
/// 若有餘數 (或預算不足一段) 再補上預算本身。最後一個值永遠就是預算。
///
/// break 數量超過 `max_breaks` 時回傳 `InvalidInput`，不會配置任何序列。
pub fn decompose(
    budget: &Budget,
    increment_enabled: bool,
    max_breaks: usize,
) -> Result<BreakSequence> {
    let total = budget.value();
    if !increment_enabled {
        return Ok(BreakSequence::from_values(vec![total]));
    }

    let steps = (total / INCREMENT).floor();
    let full_increments = steps * INCREMENT;
    let remainder = total % INCREMENT;
    let needs_tail = remainder > 0.0 || full_increments == 0.0;

    let count = steps + if needs_tail { 1.0 } else { 0.0 };
    if count > max_breaks as f64 {
        return Err(AppError::invalid_input(
            "budget",
            format!(
                "{} in steps of {} needs {} breaks, at most {} allowed",
                total, INCREMENT, count, max_breaks
            ),
        ));
    }

    let mut values: Vec<f64> = (1..=steps as usize).map(|i| i as f64 * INCREMENT).collect();

    if needs_tail {
        // full_increments + remainder 在數學上等於預算，直接使用原值避免浮點誤差
        values.push(total);
    }

    Ok(BreakSequence::from_values(values))
}
