use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use serde::{Deserialize, Serialize};

use crate::api::flash::Flash;
use crate::api::forms::{FormErrors, LibraryForm};
use crate::api::middleware::CurrentUser;
use crate::api::state::AppState;
use crate::api::views::{owner_url, View};
use crate::db::{parse_page, Book, BookRepository, Owner, OwnerRepository, Page, User};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddBookQuery {
    pub bookname: Option<String>,
}

/// A book in the catalog together with the owners it is linked to.
#[derive(Debug, Serialize)]
pub struct BookEntry {
    #[serde(flatten)]
    pub book: Book,
    pub owners: Vec<Owner>,
}

#[derive(Debug, Serialize)]
pub struct Catalog {
    pub query: Option<String>,
    pub owners: Vec<Owner>,
    pub books: Vec<BookEntry>,
}

#[derive(Debug, Serialize)]
pub struct OwnerDetail {
    pub owner: Owner,
    pub books: Vec<Book>,
}

#[derive(Debug, Serialize)]
pub struct LibraryPage {
    pub form: LibraryForm,
    pub owners: Page<Owner>,
}

#[derive(Debug, Serialize)]
pub struct EntryPage {
    pub form: LibraryForm,
}

/// GET /author
pub async fn author(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    flash: Flash,
    Query(query): Query<SearchQuery>,
) -> Result<View<Catalog>, AppError> {
    let q = query.q.filter(|q| !q.is_empty());
    let (owners, books) = match &q {
        Some(q) => (
            OwnerRepository::search(&state.db, q).await?,
            BookRepository::search(&state.db, q).await?,
        ),
        None => (
            OwnerRepository::all(&state.db).await?,
            BookRepository::all(&state.db).await?,
        ),
    };

    let mut entries = Vec::with_capacity(books.len());
    for book in books {
        let owners = BookRepository::owners(&state.db, book.id).await?;
        entries.push(BookEntry { book, owners });
    }

    let catalog = Catalog {
        query: q,
        owners,
        books: entries,
    };

    Ok(View::new("Authors", &flash, catalog).for_user(Some(&user)))
}

/// GET /delete/{slug}
pub async fn delete(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    flash: Flash,
    Path(slug): Path<String>,
) -> Result<Redirect, AppError> {
    if !OwnerRepository::delete_by_slug(&state.db, &slug).await? {
        return Err(AppError::NotFound(format!("No author at {}", slug)));
    }

    tracing::info!(slug = %slug, user_id = user.id, "author deleted");
    flash.info("The author is gone!");
    Ok(Redirect::to("/library"))
}

/// GET /bookdel/{slug},{bookname}
pub async fn bookdel(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    flash: Flash,
    Path(pair): Path<String>,
) -> Result<View<OwnerDetail>, AppError> {
    let (slug, bookname) = pair
        .split_once(',')
        .map(|(slug, bookname)| (slug.trim(), bookname.trim_start()))
        .ok_or_else(|| AppError::NotFound(format!("No author/book pair at {}", pair)))?;

    let owner = OwnerRepository::get_by_slug(&state.db, slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No author at {}", slug)))?;
    let not_linked =
        || AppError::NotFound(format!("{} has no book named {}", owner.name, bookname));

    let book = OwnerRepository::linked_book(&state.db, owner.id, bookname)
        .await?
        .ok_or_else(not_linked)?;
    if !OwnerRepository::remove_book(&state.db, owner.id, book.id).await? {
        return Err(not_linked());
    }

    tracing::info!(owner_id = owner.id, book_id = book.id, user_id = user.id, "book unlinked");
    flash.info(format!("\"{}\" has been removed", bookname));

    let books = OwnerRepository::books(&state.db, owner.id).await?;
    let title = owner.name.clone();
    Ok(View::new(title, &flash, OwnerDetail { owner, books }).for_user(Some(&user)))
}

/// GET /{slug}
pub async fn author_detail(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    flash: Flash,
    Path(slug): Path<String>,
) -> Result<View<OwnerDetail>, AppError> {
    let owner = OwnerRepository::get_by_slug(&state.db, &slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No author at {}", slug)))?;

    owner_page(&state, &flash, &user, owner).await
}

/// GET /owner/{ownername}
pub async fn owner(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    flash: Flash,
    Path(name): Path<String>,
) -> Result<View<OwnerDetail>, AppError> {
    let owner = OwnerRepository::get_by_name(&state.db, &name)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No author named {}", name)))?;

    owner_page(&state, &flash, &user, owner).await
}

async fn owner_page(
    state: &AppState,
    flash: &Flash,
    user: &User,
    owner: Owner,
) -> Result<View<OwnerDetail>, AppError> {
    let books = OwnerRepository::books(&state.db, owner.id).await?;
    let title = owner.name.clone();
    Ok(View::new(title, flash, OwnerDetail { owner, books }).for_user(Some(user)))
}

/// GET /library/
pub async fn library(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    flash: Flash,
    Query(query): Query<PageQuery>,
) -> Result<View<LibraryPage>, AppError> {
    library_page(&state, &flash, &user, &query, LibraryForm::default()).await
}

async fn library_page(
    state: &AppState,
    flash: &Flash,
    user: &User,
    query: &PageQuery,
    form: LibraryForm,
) -> Result<View<LibraryPage>, AppError> {
    let page = parse_page(query.page.as_deref());
    let owners = OwnerRepository::page(&state.db, page, state.config.owners_per_page).await?;

    Ok(View::new("library", flash, LibraryPage { form, owners }).for_user(Some(user)))
}

/// POST /library/
///
/// Finds or creates both sides of the entry and links them, all in one transaction.
pub async fn create_entry(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    flash: Flash,
    Query(query): Query<PageQuery>,
    Form(form): Form<LibraryForm>,
) -> Result<Response, AppError> {
    if let Err(errors) = form.validate() {
        let page = library_page(&state, &flash, &user, &query, form).await?;
        return Ok(page.with_errors(errors).into_response());
    }

    let ownername = form.ownername.trim();
    let bookname = form.bookname.trim();
    let mut messages = Vec::new();

    let mut tx = state.db.begin().await?;

    let owner = match OwnerRepository::get_by_name(&mut *tx, ownername).await? {
        Some(owner) => owner,
        None => match OwnerRepository::create(&mut *tx, ownername, form.body.trim()).await {
            Ok(owner) => {
                messages.push(format!("{} successfully added", ownername));
                owner
            }
            Err(AppError::Conflict(message)) => {
                flash.error(message);
                return Ok(Redirect::to("/library").into_response());
            }
            Err(e) => return Err(e),
        },
    };

    let book = match BookRepository::get_by_name(&mut *tx, bookname).await? {
        Some(book) => book,
        None => {
            let book = BookRepository::create(&mut *tx, bookname).await?;
            messages.push(format!("\"{}\" successfully added to the base of books", bookname));
            book
        }
    };

    if OwnerRepository::has_book(&mut *tx, owner.id, book.id).await? {
        messages.push(format!("{} already has \"{}\"", ownername, bookname));
    } else {
        OwnerRepository::add_book(&mut *tx, owner.id, book.id).await?;
        messages.push(format!("\"{}\" successfully added to {}", bookname, ownername));
    }

    tx.commit().await?;

    tracing::info!(owner_id = owner.id, book_id = book.id, user_id = user.id, "library entry saved");
    for message in messages {
        flash.info(message);
    }
    Ok(Redirect::to("/library").into_response())
}

/// GET /add_book/{ownername}?bookname=...
pub async fn add_book(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    flash: Flash,
    Path(ownername): Path<String>,
    Query(query): Query<AddBookQuery>,
) -> Result<Redirect, AppError> {
    let mut tx = state.db.begin().await?;

    let Some(owner) = OwnerRepository::get_by_name(&mut *tx, &ownername).await? else {
        flash.error(format!("Owner {} not found.", ownername));
        return Ok(Redirect::to("/library"));
    };

    let bookname = query.bookname.as_deref().map(str::trim).unwrap_or_default();
    if bookname.is_empty() {
        flash.error("Book name is required.");
        return Ok(Redirect::to(&owner_url(&ownername)));
    }

    let book = match BookRepository::get_by_name(&mut *tx, bookname).await? {
        Some(book) => book,
        None => BookRepository::create(&mut *tx, bookname).await?,
    };
    let linked = OwnerRepository::add_book(&mut *tx, owner.id, book.id).await?;

    tx.commit().await?;

    if linked {
        tracing::info!(owner_id = owner.id, book_id = book.id, user_id = user.id, "book added");
        flash.success(format!("You added {} to the list of owner {}!", bookname, ownername));
    } else {
        flash.info(format!("{} already has \"{}\"", ownername, bookname));
    }
    Ok(Redirect::to(&owner_url(&ownername)))
}

/// GET /lib
pub async fn lib_page(CurrentUser(user): CurrentUser, flash: Flash) -> View<EntryPage> {
    View::new("library", &flash, EntryPage { form: LibraryForm::default() }).for_user(Some(&user))
}

/// POST /lib
///
/// Always creates a fresh author and a fresh book.
pub async fn lib(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    flash: Flash,
    Form(form): Form<LibraryForm>,
) -> Result<Response, AppError> {
    if let Err(errors) = form.validate() {
        return Ok(entry_page(&flash, &user, form, errors).into_response());
    }

    let ownername = form.ownername.trim();
    let bookname = form.bookname.trim();

    let mut tx = state.db.begin().await?;

    let owner = match OwnerRepository::create(&mut *tx, ownername, form.body.trim()).await {
        Ok(owner) => owner,
        Err(AppError::Conflict(message)) => {
            flash.error(message);
            return Ok(Redirect::to("/lib").into_response());
        }
        Err(e) => return Err(e),
    };
    let book = BookRepository::create(&mut *tx, bookname).await?;
    OwnerRepository::add_book(&mut *tx, owner.id, book.id).await?;

    tx.commit().await?;

    flash.info(format!(
        "Library requested for author {}, book name={}",
        ownername, bookname
    ));
    Ok(Redirect::to("/index").into_response())
}

fn entry_page(flash: &Flash, user: &User, form: LibraryForm, errors: FormErrors) -> View<EntryPage> {
    View::new("library", flash, EntryPage { form })
        .for_user(Some(user))
        .with_errors(errors)
}
