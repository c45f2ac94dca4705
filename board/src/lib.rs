//! Headless posts board.
//!
//! [`PostsBoard`] wires one executor per verb and a busy map into the
//! actions a user can take, and [`BoardView`] is what a front end draws.
//! The `posts-board` binary renders it as text.

pub mod view;

pub use view::{BoardChanges, BoardView, PostRow, PostsBoard, ResultLine, VISIBLE_POSTS};
