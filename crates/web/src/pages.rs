//! HTML pages

use yak_common::DomainSnapshot;

/// Login form, shown to every request without a valid session
pub const LOGIN_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
	<title>YAK</title>
	<meta charset="utf-8">
	<meta name="viewport" content="width=device-width, initial-scale=1">
	<link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/bulma@0.9.2/css/bulma.min.css">
</head>
<body>
	<section class="section">
		<div class="container is-max-desktop">
			<div class="columns is-centered">
				<h1 class="title">YAK</h1>
				<figure class="image">
					<img src="images/yak.png" alt="">
				</figure>
			</div>
			<form class="box" method="post" action="/login">
				<div class="field">
					<label for="name">Username</label>
					<div class="control">
						<input class="input" type="text" id="name" name="name" placeholder="e.g. jack">
					</div>
				</div>
				<div class="field">
					<label for="password">Password</label>
					<div class="control">
						<input class="input" type="password" id="password" name="password" placeholder="**********">
					</div>
				</div>
				<input class="button is-primary" type="submit" value="Login">
			</form>
		</div>
	</section>
</body>
</html>
"#;

/// Domain list for an authenticated operator
pub fn domain_list(username: &str, snapshot: &DomainSnapshot) -> String {
    let mut items = String::new();
    for name in &snapshot.names {
        items.push_str("\t\t\t\t<li>");
        items.push_str(&escape_html(name));
        items.push_str("</li>\n");
    }
    if items.is_empty() {
        items.push_str("\t\t\t\t<li><em>none</em></li>\n");
    }

    let refreshed = snapshot
        .refreshed_at
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "never".to_string());

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
	<title>YAK</title>
	<meta charset="utf-8">
	<meta name="viewport" content="width=device-width, initial-scale=1">
	<link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/bulma@0.9.2/css/bulma.min.css">
</head>
<body>
	<section class="section">
		<div class="container is-max-desktop">
			<div class="box">
				<p>Signed in as <strong>{user}</strong></p>
				<form method="post" action="/logout">
					<input class="button is-small" type="submit" value="Logout">
				</form>
			</div>
			<h2 class="subtitle">Running VMs:</h2>
			<ul id="domains">
{items}			</ul>
			<p class="is-size-7">Last refresh: {refreshed}</p>
		</div>
	</section>
</body>
</html>
"#,
        user = escape_html(username),
        items = items,
        refreshed = refreshed,
    )
}

/// Escape text for an HTML element body or quoted attribute
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
