//! Column-per-status board.

use crate::models::{Status, Task, TaskPatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

/// Column a task belongs in. A completed task is always in `done`.
pub fn column_of(task: &Task) -> Status {
    if task.completed { Status::Done } else { task.status }
}

/// Neighbouring column, None at the board edges
pub fn neighbour(status: Status, direction: Direction) -> Option<Status> {
    let idx = Status::ALL.iter().position(|s| *s == status)?;
    let next = match direction {
        Direction::Left => idx.checked_sub(1)?,
        Direction::Right => idx + 1,
    };
    Status::ALL.get(next).copied()
}

/// Patch that drops the task into `status`, or None if it is already there
pub fn drop_into(task: &Task, status: Status) -> Option<TaskPatch> {
    if column_of(task) == status {
        return None;
    }
    Some(TaskPatch {
        status: Some(status),
        completed: Some(status == Status::Done),
        ..Default::default()
    })
}

/// Shift the task one column. Returns the patch to persist, None at an edge.
pub fn move_task(task: &mut Task, direction: Direction) -> Option<TaskPatch> {
    let target = neighbour(column_of(task), direction)?;
    let patch = drop_into(task, target)?;
    patch.apply(task);
    Some(patch)
}

#[derive(Debug)]
pub struct Board<'a> {
    columns: [Vec<&'a Task>; 3],
}

impl<'a> Board<'a> {
    /// Group tasks by column, keeping their order
    pub fn from_tasks<I>(tasks: I) -> Self
    where
        I: IntoIterator<Item = &'a Task>,
    {
        let mut columns: [Vec<&'a Task>; 3] = Default::default();
        for task in tasks {
            columns[column_index(column_of(task))].push(task);
        }
        Self { columns }
    }

    pub fn column(&self, status: Status) -> &[&'a Task] {
        &self.columns[column_index(status)]
    }

    pub fn columns(&self) -> impl Iterator<Item = (Status, &[&'a Task])> {
        Status::ALL.iter().map(move |s| (*s, self.column(*s)))
    }

    pub fn len(&self) -> usize {
        self.columns.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn column_index(status: Status) -> usize {
    match status {
        Status::Todo => 0,
        Status::InProgress => 1,
        Status::Done => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(title: &str, status: Status) -> Task {
        let mut t = Task::new(1, title.to_string());
        t.set_status(status);
        t
    }

    #[test]
    fn groups_by_column_in_order() {
        let tasks = vec![
            task("a", Status::Todo),
            task("b", Status::Done),
            task("c", Status::InProgress),
            task("d", Status::Todo),
        ];
        let board = Board::from_tasks(&tasks);
        let titles = |s| board.column(s).iter().map(|t| t.title.as_str()).collect::<Vec<_>>();
        assert_eq!(titles(Status::Todo), vec!["a", "d"]);
        assert_eq!(titles(Status::InProgress), vec!["c"]);
        assert_eq!(titles(Status::Done), vec!["b"]);
        assert_eq!(board.len(), 4);
    }

    #[test]
    fn completed_flag_decides_the_column() {
        let mut t = task("odd", Status::InProgress);
        t.completed = true;
        assert_eq!(column_of(&t), Status::Done);
    }

    #[test]
    fn moving_keeps_completed_in_step() {
        let mut t = task("a", Status::InProgress);
        let patch = move_task(&mut t, Direction::Right).unwrap();
        assert_eq!(patch.completed, Some(true));
        assert!(t.completed);
        assert_eq!(t.status, Status::Done);

        assert!(move_task(&mut t, Direction::Right).is_none());

        move_task(&mut t, Direction::Left).unwrap();
        assert!(!t.completed);
        assert_eq!(t.status, Status::InProgress);
        move_task(&mut t, Direction::Left).unwrap();
        assert!(move_task(&mut t, Direction::Left).is_none());
        assert_eq!(t.status, Status::Todo);
    }

    #[test]
    fn drop_into_same_column_is_a_no_op() {
        let t = task("a", Status::Todo);
        assert!(drop_into(&t, Status::Todo).is_none());
        assert_eq!(drop_into(&t, Status::Done).unwrap().completed, Some(true));
    }
}
