use crate::motion::Vec3;
use crate::request::TableId;

/// Fixed world positions for the dining room: six tables in two rows of
/// three, plus the waiter's station by the kitchen pass. Static
/// configuration, not derived from scene data at runtime.
#[derive(Debug, Clone)]
pub struct TableLayout {
    positions: [Vec3; 6],
    waiter_spawn: Vec3,
}

impl Default for TableLayout {
    fn default() -> Self {
        Self {
            positions: [
                Vec3::new(-6.0, 0.0, -4.0),
                Vec3::new(0.0, 0.0, -4.0),
                Vec3::new(6.0, 0.0, -4.0),
                Vec3::new(-6.0, 0.0, 4.0),
                Vec3::new(0.0, 0.0, 4.0),
                Vec3::new(6.0, 0.0, 4.0),
            ],
            waiter_spawn: Vec3::new(0.0, 0.0, 9.0),
        }
    }
}

impl TableLayout {
    /// World position of a table, if the id is on the floor plan.
    pub fn position(&self, table: TableId) -> Option<Vec3> {
        if table == 0 {
            return None;
        }
        self.positions.get(table as usize - 1).copied()
    }

    pub fn waiter_spawn(&self) -> Vec3 {
        self.waiter_spawn
    }
}

/// Map a clicked scene-object name to a table id. Object names follow the
/// `Table_<n>` / `Number_<n>` convention anywhere in the identifier, case
/// insensitive (e.g. "table_3", "Number_6_Mesh.001").
pub fn parse_table_id(name: &str) -> Option<TableId> {
    let lower = name.to_ascii_lowercase();
    let idx = match (lower.find("table_"), lower.find("number_")) {
        (Some(a), Some(b)) => {
            if a < b {
                a + "table_".len()
            } else {
                b + "number_".len()
            }
        }
        (Some(a), None) => a + "table_".len(),
        (None, Some(b)) => b + "number_".len(),
        (None, None) => return None,
    };
    let digits: String = lower[idx..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse::<TableId>().ok()
}
