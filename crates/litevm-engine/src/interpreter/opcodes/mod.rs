//! Opcode execution rules, grouped per instruction family.

mod arithmetic;
mod arrays;
mod calls;
mod constants;
mod control_flow;
mod objects;
mod variables;
