pub mod seqfile;
pub mod xml;
