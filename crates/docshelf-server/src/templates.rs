//! HTML templates for the web interface.
//!
//! Plain `format!` templates without a template engine. Every dynamic value
//! is escaped with [`html_escape`]; path segments are percent-encoded.

use docshelf_core::authz::SessionUser;
use docshelf_core::credentials::{Role, UserRecord};

const STYLES: &str = r#"
    body {
        font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, Arial, sans-serif;
        max-width: 860px;
        margin: 40px auto;
        padding: 0 20px;
        color: #333;
    }
    header {
        display: flex;
        justify-content: space-between;
        align-items: center;
        border-bottom: 2px solid #0066cc;
        margin-bottom: 20px;
    }
    .flash {
        background: #fcf8e3;
        border: 1px solid #faebcc;
        padding: 10px;
        border-radius: 4px;
    }
    .error {
        color: #a94442;
        background: #f2dede;
        padding: 10px;
        border-radius: 4px;
    }
    ul.files li, ul.users li {
        margin: 8px 0;
    }
    form.inline {
        display: inline;
    }
    textarea {
        width: 100%;
        font-family: monospace;
    }
    label {
        display: block;
        margin-top: 10px;
        font-weight: bold;
    }
"#;

/// Escape HTML special characters.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

fn path_segment(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

/// Everything the page chrome needs.
#[derive(Debug, Clone, Copy, Default)]
pub struct Chrome<'a> {
    pub user: Option<&'a SessionUser>,
    pub flash: Option<&'a str>,
}

fn account_bar(user: Option<&SessionUser>) -> String {
    match user {
        Some(user) => {
            let users_button = if user.role == Role::Admin {
                r#"<form class="inline" method="get" action="/users/view"><button type="submit">Edit Users</button></form>"#
            } else {
                ""
            };
            format!(
                r#"<p>Signed in as {name}.
    <form class="inline" method="post" action="/user/logout"><button type="submit">Sign Out</button></form>
    {users_button}</p>"#,
                name = html_escape(&user.username),
            )
        }
        None => r#"<p><form class="inline" method="get" action="/user/login"><button type="submit">Sign In</button></form></p>"#
            .to_owned(),
    }
}

fn layout(title: &str, chrome: Chrome<'_>, body: &str) -> String {
    let flash_html = chrome.flash.map_or(String::new(), |message| {
        format!(r#"<p class="flash">{}</p>"#, html_escape(message))
    });
    let account = account_bar(chrome.user);

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>{title} - docshelf</title>
    <style>{STYLES}</style>
</head>
<body>
    <header>
        <h1><a href="/">docshelf</a></h1>
        {account}
    </header>
    {flash_html}
    {body}
</body>
</html>"#,
        title = html_escape(title),
    )
}

fn error_block(error: Option<&str>) -> String {
    error.map_or(String::new(), |e| {
        format!(r#"<p class="error">{}</p>"#, html_escape(e))
    })
}

/// The home page: every document with its actions.
pub fn index(files: &[String], chrome: Chrome<'_>) -> String {
    let items: String = files
        .iter()
        .map(|name| {
            let href = path_segment(name);
            let label = html_escape(name);
            format!(
                r#"
        <li><a href="/{href}">{label}</a>
            <a href="/edit/{href}">Edit</a>
            <form class="inline" method="post" action="/delete/{href}"><button type="submit">Delete</button></form></li>"#
            )
        })
        .collect();

    let body = format!(
        r#"<h2>File List</h2>
    <ul class="files">{items}
    </ul>
    <p><a href="/create/new-document">New Document</a></p>"#
    );
    layout("File List", chrome, &body)
}

/// Edit form for an existing document.
pub fn edit_document(name: &str, content: &str, chrome: Chrome<'_>) -> String {
    let body = format!(
        r#"<h2>Editing content of {label}</h2>
    <form method="post" action="/edit/{href}">
        <textarea name="content" rows="20">{content}</textarea>
        <button type="submit">Save Changes</button>
    </form>"#,
        label = html_escape(name),
        href = path_segment(name),
        content = html_escape(content),
    );
    layout(&format!("Edit {name}"), chrome, &body)
}

/// Form for creating a document.
pub fn new_document(filename: &str, error: Option<&str>, chrome: Chrome<'_>) -> String {
    let body = format!(
        r#"<h2>Add a new document</h2>
    {error}
    <form method="post" action="/create/new-document">
        <label for="filename">Filename</label>
        <input type="text" id="filename" name="filename" value="{filename}" autofocus>
        <button type="submit">Create</button>
    </form>"#,
        error = error_block(error),
        filename = html_escape(filename),
    );
    layout("New Document", chrome, &body)
}

/// The sign-in form.
pub fn login(username: &str, error: Option<&str>, chrome: Chrome<'_>) -> String {
    let body = format!(
        r#"<h2>User Sign-In</h2>
    {error}
    <form method="post" action="/user/login">
        <label for="username">Username</label>
        <input type="text" id="username" name="username" value="{username}" autofocus>
        <label for="password">Password</label>
        <input type="password" id="password" name="password">
        <button type="submit">Sign In</button>
    </form>"#,
        error = error_block(error),
        username = html_escape(username),
    );
    layout("Sign In", chrome, &body)
}

/// The administrator's user list.
///
/// `current` is never offered a delete button.
pub fn users(records: &[UserRecord], current: &str, chrome: Chrome<'_>) -> String {
    let items: String = records
        .iter()
        .map(|record| {
            let href = path_segment(&record.username);
            let delete = if record.username == current {
                String::new()
            } else {
                format!(
                    r#"<form class="inline" method="post" action="/users/delete/{href}"><button type="submit">Delete</button></form>"#
                )
            };
            format!(
                r#"
        <li>Username: {name} ({role})
            <form class="inline" method="get" action="/users/edit/{href}"><button type="submit">Edit</button></form>
            {delete}</li>"#,
                name = html_escape(&record.username),
                role = record.role,
            )
        })
        .collect();

    let body = format!(
        r#"<h2>Users</h2>
    <ul class="users">{items}
    </ul>
    <form method="get" action="/users/add"><button type="submit">Add User</button></form>"#
    );
    layout("Users", chrome, &body)
}

/// Form for adding a user.
pub fn add_user(username: &str, role: Role, error: Option<&str>, chrome: Chrome<'_>) -> String {
    let (regular, admin) = match role {
        Role::Regular => (" selected", ""),
        Role::Admin => ("", " selected"),
    };
    let body = format!(
        r#"<h2>Add User</h2>
    {error}
    <form method="post" action="/users/add">
        <label for="new_username">Username</label>
        <input type="text" id="new_username" name="new_username" value="{username}" autofocus>
        <label for="new_password">Password</label>
        <input type="password" id="new_password" name="new_password">
        <label for="role">Role</label>
        <select id="role" name="role">
            <option value="regular"{regular}>regular</option>
            <option value="admin"{admin}>admin</option>
        </select>
        <button type="submit">Add User</button>
    </form>"#,
        error = error_block(error),
        username = html_escape(username),
    );
    layout("Add User", chrome, &body)
}

/// Form for renaming a user or changing their password.
pub fn edit_user(original: &str, proposed: &str, error: Option<&str>, chrome: Chrome<'_>) -> String {
    let body = format!(
        r#"<h2>Edit User</h2>
    {error}
    <form method="post" action="/users/edit/{href}">
        <label for="new_username">Username</label>
        <input type="text" id="new_username" name="new_username" value="{proposed}" autofocus>
        <label for="new_password">New password (leave blank to keep the current one)</label>
        <input type="password" id="new_password" name="new_password">
        <button type="submit">Save</button>
    </form>"#,
        error = error_block(error),
        href = path_segment(original),
        proposed = html_escape(proposed),
    );
    layout("Edit User", chrome, &body)
}
