pub mod acfg;
pub mod dot;
pub mod frontier;
pub mod groups;
pub mod interprocedural;
pub mod postdom;
