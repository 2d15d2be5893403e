use std::path::Path;

pub fn handle(iso: &Path) -> god_storage::Result<()> {
    let info = god_storage::inspect(iso)?;

    println!("Executable:  {}", info.executable);
    println!("Title ID:    {}", info.title_id);
    println!("Media ID:    {}", info.media_id);
    println!("Platform:    {}", info.platform);
    println!("Disc layout: {}", info.variant);
    println!("Size:        {} bytes", info.size_bytes);
    Ok(())
}
