pub mod domino;
