mod mem_quad_store;
mod sql;
