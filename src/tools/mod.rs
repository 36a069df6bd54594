pub mod media_insert_tool;
pub mod pdf_block_tool;
pub mod pdf_embed_tool;
