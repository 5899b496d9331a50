use std::{
	env,
	io::{self, BufRead, Write},
	path::Path,
};

use chmview::{
	shell::{ViewerShell, ViewInstance},
	types::{OpenFlags, OpenOptions},
};

/// Minimal interactive driver around the shell: one command per line, the
/// status line echoed after every action. It exists so the orchestrator
/// can be exercised by hand; it owns no navigation logic of its own.
pub fn run(shell: &mut ViewerShell) {
	println!("chmview console. Type 'help' for commands.");
	let stdin = io::stdin();
	let mut out = io::stdout();
	loop {
		print!("> ");
		let _ = out.flush();
		let mut line = String::new();
		match stdin.lock().read_line(&mut line) {
			Ok(0) | Err(_) => break,
			Ok(_) => {}
		}
		if !dispatch(shell, line.trim()) {
			break;
		}
		for url in shell.take_external_requests() {
			println!("external link (open it in your browser): {url}");
		}
		if !shell.status().is_empty() {
			println!("-- {}", shell.status());
		}
		if shell.shutdown_requested() {
			break;
		}
	}
}

fn dispatch(shell: &mut ViewerShell, line: &str) -> bool {
	let mut parts = line.splitn(2, char::is_whitespace);
	let command = parts.next().unwrap_or_default();
	let rest = parts.next().unwrap_or_default().trim();
	match command {
		"" => {}
		"help" => print_help(),
		"open" => shell.post_raw_event("open-file", &[rest.to_string()]),
		"page" => page_command(shell, rest),
		"back" => shell.navigate_back(),
		"forward" => shell.navigate_forward(),
		"home" => shell.navigate_home(),
		"prev" => shell.navigate_prev_in_toc(),
		"next" => shell.navigate_next_in_toc(),
		"tabs" => print_tabs(shell),
		"close" => shell.close_current_tab(),
		"index" => shell.post_raw_event("find-in-index", &[rest.to_string()]),
		"search" => print_search(shell, rest),
		"toc" => print_toc(shell),
		"locate" => shell.locate_in_contents(),
		"encoding" => {
			shell.set_text_encoding(rest);
		}
		"bookmark" => shell.add_bookmark(rest),
		"bookmarks" => print_bookmarks(shell),
		"recent" => print_recent(shell),
		"extract" => extract_command(shell, rest),
		"quit" | "exit" => return false,
		other => println!("unknown command: {other}"),
	}
	true
}

fn page_command(shell: &mut ViewerShell, rest: &str) {
	let mut parts = rest.split_whitespace();
	let Some(target) = parts.next() else {
		println!("usage: page <target> [flags]");
		return;
	};
	let options = parts.next().and_then(|raw| raw.parse().ok()).map_or_else(
		|| OpenOptions::new().with_content_tree().with_add_to_history(),
		|bits| OpenFlags::from_bits_truncate(bits).into(),
	);
	let _ = shell.open_page(target, options);
}

fn extract_command(shell: &mut ViewerShell, rest: &str) {
	if rest.is_empty() {
		match shell.extract_current_page(&env::temp_dir()) {
			Ok(path) => println!("extracted to {}", path.display()),
			Err(err) => println!("extraction failed: {err:#}"),
		}
		return;
	}
	match shell.extract_all(Path::new(rest)) {
		Ok(count) => println!("extracted {count} pages to {rest}"),
		Err(err) => println!("extraction failed: {err:#}"),
	}
}

fn print_tabs(shell: &ViewerShell) {
	let views = shell.view_window_mgr();
	if views.is_empty() {
		println!("no open tabs");
		return;
	}
	let active = views.active_id();
	for view in views.iter() {
		let marker = if active == Some(view.id()) { "*" } else { " " };
		println!("{marker} {}", describe(view));
	}
}

fn describe(view: &ViewInstance) -> String {
	let target = view.current().unwrap_or("(blank)");
	format!("{target} [back: {}, forward: {}]", view.back_stack().len(), view.forward_stack().len())
}

fn print_search(shell: &mut ViewerShell, query: &str) {
	shell.search(query);
	for hit in shell.search_window().results() {
		println!("{} -> {}", hit.title, hit.target);
	}
}

fn print_toc(shell: &ViewerShell) {
	let selection = shell.contents_window().selection().map(str::to_string);
	for (title, target) in chmview::document::flatten_toc(shell.contents_window().toc()) {
		let marker =
			if selection.as_deref() == Some(chmview::document::normalize_target(&target).as_str()) { ">" } else { " " };
		println!("{marker} {title}\t{target}");
	}
}

fn print_bookmarks(shell: &ViewerShell) {
	for bookmark in shell.bookmarks_window().items() {
		println!("{} -> {}", bookmark.title, bookmark.target);
	}
}

fn print_recent(shell: &ViewerShell) {
	for path in shell.config().get_recent_documents() {
		println!("{path}");
	}
}

fn print_help() {
	println!("Commands:");
	println!("  open <path>        load a document (directory of pages)");
	println!("  page <target> [f]  open a page; f is an optional flag integer");
	println!("  back | forward     walk the active tab's history");
	println!("  home | prev | next start page and contents-order neighbors");
	println!("  tabs | close       list tabs / close the active tab");
	println!("  index <keyword>    navigate via the index panel");
	println!("  search <text>      title search over contents and index");
	println!("  toc | locate       show the contents tree / sync its selection");
	println!("  encoding <label>   switch the text encoding (e.g. windows-1251)");
	println!("  bookmark [title]   bookmark the current page");
	println!("  bookmarks | recent saved bookmarks / recently opened files");
	println!("  extract [dir]      extract the current page, or all pages to dir");
	println!("  quit               leave");
}
